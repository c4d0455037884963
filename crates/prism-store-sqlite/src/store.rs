//! [`SqliteStore`] — the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use prism_core::{
  product::CatalogRecord,
  query::{Page, ProductQuery, SortSpec},
  store::{CatalogStore, InsertOutcome},
};

use crate::{
  Error, Result,
  encode::{COLUMNS, RawProductRow, encode_record},
  schema::SCHEMA,
  sql,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A catalog replica backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn insert_sql() -> String {
    let n = COLUMNS.split(',').count();
    format!(
      "INSERT OR IGNORE INTO products ({COLUMNS}) VALUES ({})",
      vec!["?"; n].join(", ")
    )
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  async fn find_ids(
    &self,
    query: &ProductQuery,
    sort: &SortSpec,
    page: &Page,
  ) -> Result<Vec<String>> {
    let (where_sql, mut params) = sql::where_clause(query);
    let order_sql = sql::order_by_clause(sort);
    params.push(rusqlite::types::Value::Integer(i64::from(page.limit)));
    params.push(rusqlite::types::Value::Integer(page.skip() as i64));

    let statement = format!(
      "SELECT external_id FROM products {where_sql} {order_sql} \
       LIMIT ? OFFSET ?"
    );

    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&statement)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            row.get::<_, String>(0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(ids)
  }

  async fn count(&self, query: &ProductQuery) -> Result<u64> {
    let (where_sql, params) = sql::where_clause(query);
    let statement = format!("SELECT COUNT(*) FROM products {where_sql}");

    let total = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &statement,
          rusqlite::params_from_iter(params),
          |row| row.get(0),
        )?;
        Ok(total)
      })
      .await?;

    Ok(total as u64)
  }

  async fn insert_missing(
    &self,
    records: &[CatalogRecord],
  ) -> Result<InsertOutcome> {
    let encoded: Vec<Vec<rusqlite::types::Value>> = records
      .iter()
      .map(encode_record)
      .collect::<Result<_>>()?;
    let statement = Self::insert_sql();

    let outcome = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&statement)?;
        let mut inserted = 0;
        let mut skipped = 0;
        for params in encoded {
          if stmt.execute(rusqlite::params_from_iter(params))? > 0 {
            inserted += 1;
          } else {
            skipped += 1;
          }
        }
        Ok(InsertOutcome { inserted, skipped })
      })
      .await?;

    Ok(outcome)
  }

  async fn insert_if_absent(&self, record: &CatalogRecord) -> Result<bool> {
    let params = encode_record(record)?;
    let statement = Self::insert_sql();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(&statement, rusqlite::params_from_iter(params))?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn delete(&self, external_id: &str) -> Result<bool> {
    let id = external_id.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM products WHERE external_id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn get(&self, external_id: &str) -> Result<Option<CatalogRecord>> {
    let id = external_id.to_owned();
    let statement =
      format!("SELECT {COLUMNS} FROM products WHERE external_id = ?1");

    let raw: Option<RawProductRow> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&statement, rusqlite::params![id], RawProductRow::read)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProductRow::into_record).transpose()
  }
}
