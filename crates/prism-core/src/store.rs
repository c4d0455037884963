//! The `CatalogStore` trait.
//!
//! Implemented by storage backends (e.g. `prism-store-sqlite`). The sync
//! pipeline and the read API depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use crate::{
  product::CatalogRecord,
  query::{Page, ProductQuery, SortSpec},
};

/// Counts returned by a bulk create-only insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
  pub inserted: usize,
  /// Records whose external id already existed and were left untouched.
  pub skipped:  usize,
}

/// Abstraction over the replica store.
///
/// Writes are create-only on `external_id`: inserting an id that already
/// exists is a no-op, which is the only concurrency guard the sync path
/// assumes. All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// External ids of the records matching `query`, in `sort` order, limited
  /// to the requested page. The order is total: repeated identical calls
  /// return identical sequences.
  fn find_ids<'a>(
    &'a self,
    query: &'a ProductQuery,
    sort: &'a SortSpec,
    page: &'a Page,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Number of records matching `query`.
  fn count<'a>(
    &'a self,
    query: &'a ProductQuery,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Bulk create-only insert. Records whose external id already exists are
  /// skipped; the rest are inserted. One bad record must not block its
  /// siblings.
  fn insert_missing<'a>(
    &'a self,
    records: &'a [CatalogRecord],
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + 'a;

  /// Insert a single record unless its external id exists.
  /// Returns `true` if the record was inserted.
  fn insert_if_absent<'a>(
    &'a self,
    record: &'a CatalogRecord,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete by external id. Returns `true` if a record was removed.
  fn delete<'a>(
    &'a self,
    external_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Fetch a full record by external id.
  fn get<'a>(
    &'a self,
    external_id: &'a str,
  ) -> impl Future<Output = Result<Option<CatalogRecord>, Self::Error>> + Send + 'a;
}
