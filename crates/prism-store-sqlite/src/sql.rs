//! Rendering of compiled queries and sort specs to SQL.
//!
//! Each predicate renders to one self-contained condition with `?`
//! placeholders; the conjunction joins with `AND`. Set-membership predicates
//! go through `json_each` over the JSON array columns.

use prism_core::query::{
  ListField, NumField, NumListField, Predicate, ProductQuery, SortDirection,
  SortKey, SortSpec, StrField,
};
use rusqlite::types::Value;

// ─── Column mapping ──────────────────────────────────────────────────────────

fn str_column(field: StrField) -> &'static str {
  match field {
    StrField::ExternalId => "external_id",
    StrField::Style => "style",
    StrField::Shape => "shape",
    StrField::Cut => "cut",
    StrField::DiamondColor => "diamond_color",
    StrField::Clarity => "clarity",
    StrField::Polish => "polish",
    StrField::Symmetry => "symmetry",
    StrField::Certification => "certification",
    StrField::Fluorescence => "fluorescence",
  }
}

fn list_column(field: ListField) -> &'static str {
  match field {
    ListField::Collections => "collections",
    ListField::CollectionHandles => "collection_handles",
    ListField::OptionValues => "option_values",
  }
}

fn num_list_column(field: NumListField) -> &'static str {
  match field {
    NumListField::RingCarat => "ring_carat",
  }
}

fn num_column(field: NumField) -> &'static str {
  match field {
    NumField::Carat => "carat",
    NumField::Depth => "depth",
    NumField::PriceAmount => "price_amount",
    NumField::Table => "table_pct",
    NumField::LwRatio => "lw_ratio",
  }
}

fn sort_column(key: SortKey) -> &'static str {
  match key {
    SortKey::HasStyle => "has_style",
    SortKey::HasCut => "has_cut",
    SortKey::HasShape => "has_shape",
    SortKey::Price => "price_amount",
    SortKey::Style => "style",
    SortKey::Cut => "cut",
    SortKey::Shape => "shape",
    SortKey::Title => "title",
    SortKey::CreatedAt => "created_at",
  }
}

// ─── WHERE rendering ─────────────────────────────────────────────────────────

fn placeholders(n: usize) -> String {
  vec!["?"; n].join(", ")
}

/// Render `query` to a `WHERE` clause (empty string when unfiltered) and its
/// bound parameters, in placeholder order.
pub fn where_clause(query: &ProductQuery) -> (String, Vec<Value>) {
  let mut conditions = Vec::new();
  let mut params: Vec<Value> = Vec::new();

  for predicate in &query.predicates {
    match predicate {
      Predicate::Text(term) => {
        conditions
          .push("(title LIKE ? OR description LIKE ? OR handle LIKE ?)".to_owned());
        let pattern = format!("%{term}%");
        params.push(Value::Text(pattern.clone()));
        params.push(Value::Text(pattern.clone()));
        params.push(Value::Text(pattern));
      }
      Predicate::AnyOf { field, values } => {
        conditions.push(format!(
          "{} IN ({})",
          str_column(*field),
          placeholders(values.len())
        ));
        params.extend(values.iter().map(|v| Value::Text(v.clone())));
      }
      Predicate::Intersects { field, values } => {
        conditions.push(format!(
          "EXISTS (SELECT 1 FROM json_each(products.{}) \
           WHERE json_each.value IN ({}))",
          list_column(*field),
          placeholders(values.len())
        ));
        params.extend(values.iter().map(|v| Value::Text(v.clone())));
      }
      Predicate::IntersectsNumbers { field, values } => {
        conditions.push(format!(
          "EXISTS (SELECT 1 FROM json_each(products.{}) \
           WHERE json_each.value IN ({}))",
          num_list_column(*field),
          placeholders(values.len())
        ));
        params.extend(values.iter().map(|v| Value::Real(*v)));
      }
      Predicate::Range { field, min, max } => {
        let column = num_column(*field);
        if let Some(min) = min {
          conditions.push(format!("{column} >= ?"));
          params.push(Value::Real(*min));
        }
        if let Some(max) = max {
          conditions.push(format!("{column} <= ?"));
          params.push(Value::Real(*max));
        }
      }
    }
  }

  let clause = if conditions.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conditions.join(" AND "))
  };
  (clause, params)
}

// ─── ORDER BY rendering ──────────────────────────────────────────────────────

/// Render `sort` to an `ORDER BY` clause. A terminal `external_id ASC` is
/// appended so records tying on every compiled key still paginate in a total
/// order.
pub fn order_by_clause(sort: &SortSpec) -> String {
  let mut parts: Vec<String> = sort
    .terms
    .iter()
    .map(|term| {
      let direction = match term.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
      };
      format!("{} {direction}", sort_column(term.key))
    })
    .collect();
  parts.push("external_id ASC".to_owned());
  format!("ORDER BY {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
  use prism_core::query::{FilterContext, compile, compile_sort};

  use super::*;

  #[test]
  fn empty_query_renders_no_where_clause() {
    let (clause, params) = where_clause(&ProductQuery::default());
    assert!(clause.is_empty());
    assert!(params.is_empty());
  }

  #[test]
  fn predicates_render_one_condition_each() {
    let params = vec![
      ("style".to_owned(), "HALO,PEAR".to_owned()),
      ("carat_min".to_owned(), "1.0".to_owned()),
      ("carat_max".to_owned(), "2.0".to_owned()),
    ];
    let (query, _, _) = compile(&FilterContext::parse(&params));
    let (clause, bound) = where_clause(&query);

    assert!(clause.starts_with("WHERE "));
    assert!(clause.contains("style IN (?, ?)"));
    assert!(clause.contains("carat >= ?"));
    assert!(clause.contains("carat <= ?"));
    assert_eq!(bound.len(), 4);
  }

  #[test]
  fn membership_predicates_use_json_each() {
    let params = vec![("options".to_owned(), "5,6".to_owned())];
    let (query, _, _) = compile(&FilterContext::parse(&params));
    let (clause, _) = where_clause(&query);
    assert!(clause.contains("json_each(products.option_values)"));
  }

  #[test]
  fn order_by_ends_with_the_id_tiebreaker() {
    let clause = order_by_clause(&compile_sort(None));
    assert_eq!(
      clause,
      "ORDER BY has_style DESC, has_cut DESC, has_shape DESC, \
       style ASC, cut ASC, shape ASC, external_id ASC"
    );
  }
}
