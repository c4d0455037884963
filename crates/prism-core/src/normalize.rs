//! Metafield Normalizer — decodes one upstream product's raw key/value
//! metadata into a typed [`CatalogRecord`].
//!
//! Field decoding is total: a bad value yields a [`SkipReason`], never an
//! error, so one malformed attribute cannot take down its record and one
//! malformed record cannot take down its batch. Raw values are recorded into
//! a [`ValueObservationLog`] before decoding, which is how new enum values
//! appearing upstream get noticed.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::{
  Result,
  product::{CatalogRecord, ProductOption},
  schema::{FieldSchema, FieldValue, ParseMode, ValueType},
};

// ─── Raw upstream shapes ─────────────────────────────────────────────────────

/// A collection the product belongs to, as delivered by the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionRef {
  pub id:     String,
  pub handle: Option<String>,
}

/// One raw metafield entry: the key plus its JSON-typed value.
#[derive(Debug, Clone)]
pub struct RawMetafield {
  pub key:   String,
  pub value: Value,
}

/// An upstream product before normalization. The sync crate's wire layer
/// flattens the API's nested node envelopes into this shape.
#[derive(Debug, Clone, Default)]
pub struct RawProduct {
  pub id:             String,
  pub title:          Option<String>,
  pub description:    Option<String>,
  pub handle:         Option<String>,
  /// RFC 3339 timestamp string as delivered.
  pub created_at:     Option<String>,
  /// Decimal amount string as delivered.
  pub price_amount:   Option<String>,
  pub price_currency: Option<String>,
  pub collections:    Vec<CollectionRef>,
  pub options:        Vec<ProductOption>,
  pub metafields:     Vec<RawMetafield>,
}

// ─── Observation log ─────────────────────────────────────────────────────────

/// Distinct raw (pre-decode) values seen per attribute key during one import
/// run. Process-scoped, never persisted; exists only for schema-drift review.
#[derive(Debug, Default, Serialize)]
pub struct ValueObservationLog {
  seen: BTreeMap<&'static str, BTreeSet<String>>,
}

impl ValueObservationLog {
  /// Record one raw value under `key`, deduplicated by canonical JSON form.
  pub fn record(&mut self, key: &'static str, raw: &Value) {
    self.seen.entry(key).or_default().insert(raw.to_string());
  }

  /// Distinct values observed for `key`, if any were.
  pub fn values(&self, key: &str) -> Option<&BTreeSet<String>> {
    self.seen.get(key)
  }

  pub fn is_empty(&self) -> bool {
    self.seen.is_empty()
  }

  /// Keys with at least one observation.
  pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.seen.keys().copied()
  }
}

// ─── Per-field outcomes ──────────────────────────────────────────────────────

/// Why a field was left unset instead of assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
  /// A numeric field whose value does not parse as a finite number.
  NotANumber,
  /// A number-list field whose value is not a non-empty sequence with a
  /// numeric first element.
  EmptySequence,
  /// A JSON-mandatory field whose string payload is not valid JSON.
  MalformedJson,
  /// Decoded to an empty or zero value, which the record never stores.
  Empty,
}

/// Result of decoding a single metafield.
#[derive(Debug, Clone, PartialEq)]
enum FieldOutcome {
  Value(FieldValue),
  Skipped(SkipReason),
}

/// A field that was skipped, reported back to the caller for diagnostics.
#[derive(Debug, Clone)]
pub struct FieldIssue {
  pub key:    &'static str,
  pub reason: SkipReason,
  pub raw:    Value,
}

// ─── Normalization ───────────────────────────────────────────────────────────

/// Decode `raw` into a [`CatalogRecord`] using the given schema registry.
///
/// Every schema-declared key that has a matching metafield is decoded
/// independently; failures are collected as [`FieldIssue`]s and logged, never
/// propagated. The returned `Err` covers only structural registry/record
/// mismatches, which indicate a bug rather than bad upstream data.
pub fn normalize(
  raw: &RawProduct,
  schema: &'static [FieldSchema],
  mut log: Option<&mut ValueObservationLog>,
) -> Result<(CatalogRecord, Vec<FieldIssue>)> {
  let mut record = CatalogRecord {
    external_id: raw.id.clone(),
    title: raw.title.clone().unwrap_or_default(),
    description: raw.description.clone().unwrap_or_default(),
    handle: raw.handle.clone().unwrap_or_default(),
    created_at: raw.created_at.as_deref().and_then(parse_timestamp),
    price_amount: raw.price_amount.as_deref().and_then(parse_finite),
    price_currency: raw.price_currency.clone(),
    collections: raw.collections.iter().map(|c| c.id.clone()).collect(),
    collection_handles: raw
      .collections
      .iter()
      .filter_map(|c| c.handle.clone())
      .collect(),
    options: raw.options.clone(),
    option_values: raw
      .options
      .iter()
      .flat_map(|o| o.values.iter().cloned())
      .collect(),
    ..CatalogRecord::default()
  };

  let mut issues = Vec::new();

  for field in schema {
    let Some(metafield) = raw.metafields.iter().find(|m| m.key == field.key)
    else {
      continue;
    };

    if !metafield.value.is_null()
      && let Some(log) = log.as_mut()
    {
      log.record(field.key, &metafield.value);
    }

    match decode_field(field, &metafield.value) {
      FieldOutcome::Value(value) => {
        if let FieldValue::Text(text) = &value
          && !field.is_known_value(text)
        {
          warn!(
            product = %raw.id,
            key = field.key,
            value = %text,
            "metafield value outside the enumerated set"
          );
        }
        record.set_attribute(field.key, value)?;
      }
      FieldOutcome::Skipped(reason) => {
        warn!(
          product = %raw.id,
          key = field.key,
          raw = %metafield.value,
          ?reason,
          "invalid metafield value, field left unset"
        );
        issues.push(FieldIssue {
          key:    field.key,
          reason,
          raw:    metafield.value.clone(),
        });
      }
    }
  }

  Ok((record, issues))
}

/// Decode one metafield value per its schema entry.
fn decode_field(field: &FieldSchema, raw: &Value) -> FieldOutcome {
  use FieldOutcome::{Skipped, Value as Decoded};

  let structured = match field.parse {
    ParseMode::Json => match raw {
      Value::String(s) => {
        let trimmed = s.trim();
        if trimmed.is_empty() {
          return Skipped(SkipReason::Empty);
        }
        match serde_json::from_str::<Value>(trimmed) {
          Ok(v) => v,
          Err(_) => return Skipped(SkipReason::MalformedJson),
        }
      }
      other => other.clone(),
    },
    ParseMode::Raw => match raw {
      Value::String(s) => Value::String(s.trim().to_owned()),
      other => other.clone(),
    },
  };

  match field.value_type {
    ValueType::Number => match as_finite(&structured) {
      Some(n) if n != 0.0 => Decoded(FieldValue::Number(n)),
      Some(_) => Skipped(SkipReason::Empty),
      None => Skipped(SkipReason::NotANumber),
    },
    ValueType::NumberList => {
      let Value::Array(items) = &structured else {
        return Skipped(SkipReason::EmptySequence);
      };
      if items.is_empty() {
        return Skipped(SkipReason::EmptySequence);
      }
      if as_finite(&items[0]).is_none() {
        return Skipped(SkipReason::NotANumber);
      }
      let numbers: Vec<f64> = items.iter().filter_map(as_finite).collect();
      Decoded(FieldValue::Numbers(numbers))
    }
    ValueType::Text => {
      let text = match structured {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return Skipped(SkipReason::Empty),
      };
      let text = text.trim().to_uppercase();
      if text.is_empty() {
        Skipped(SkipReason::Empty)
      } else {
        Decoded(FieldValue::Text(text))
      }
    }
  }
}

/// A JSON value as a finite number, accepting numeric strings.
fn as_finite(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
    Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
    _ => None,
  }
}

fn parse_finite(s: &str) -> Option<f64> {
  s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_timestamp(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
  chrono::DateTime::parse_from_rfc3339(s)
    .ok()
    .map(|dt| dt.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::schema::REGISTRY;

  fn metafield(key: &str, value: Value) -> RawMetafield {
    RawMetafield { key: key.to_owned(), value }
  }

  fn raw_product(metafields: Vec<RawMetafield>) -> RawProduct {
    RawProduct {
      id: "gid://shopify/Product/1".into(),
      title: Some("Halo Ring".into()),
      handle: Some("halo-ring".into()),
      price_amount: Some("1299.00".into()),
      price_currency: Some("USD".into()),
      metafields,
      ..RawProduct::default()
    }
  }

  #[test]
  fn textual_fields_are_trimmed_and_uppercased() {
    let raw = raw_product(vec![
      metafield("style", json!("  halo ")),
      metafield("cut", json!("ex")),
    ]);
    let (record, issues) = normalize(&raw, REGISTRY, None).unwrap();

    assert_eq!(record.style.as_deref(), Some("HALO"));
    assert_eq!(record.cut.as_deref(), Some("EX"));
    assert!(record.has_style && record.has_cut && !record.has_shape);
    assert!(issues.is_empty());
  }

  #[test]
  fn one_bad_field_does_not_abort_the_record() {
    let raw = raw_product(vec![
      metafield("carat", json!("not-a-number")),
      metafield("style", json!("HALO")),
      metafield("shape", json!("OVAL")),
      metafield("clarity", json!("VS1")),
      metafield("depth", json!("61.8")),
    ]);
    let (record, issues) = normalize(&raw, REGISTRY, None).unwrap();

    assert_eq!(record.carat, None);
    assert_eq!(record.style.as_deref(), Some("HALO"));
    assert_eq!(record.shape.as_deref(), Some("OVAL"));
    assert_eq!(record.clarity.as_deref(), Some("VS1"));
    assert_eq!(record.depth, Some(61.8));

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].key, "carat");
    assert_eq!(issues[0].reason, SkipReason::NotANumber);
  }

  #[test]
  fn number_lists_require_a_numeric_head() {
    let raw = raw_product(vec![
      metafield("ring_carat", json!("[\"1.0\", \"1.5\"]")),
      metafield("carat_size", json!(["big", "2.0"])),
    ]);
    let (record, issues) = normalize(&raw, REGISTRY, None).unwrap();

    assert_eq!(record.ring_carat, Some(vec![1.0, 1.5]));
    assert_eq!(record.carat_size, None);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].reason, SkipReason::NotANumber);
  }

  #[test]
  fn malformed_json_is_skipped_not_fatal() {
    let raw = raw_product(vec![metafield("ring_carat", json!("[1.0, "))]);
    let (record, issues) = normalize(&raw, REGISTRY, None).unwrap();

    assert_eq!(record.ring_carat, None);
    assert_eq!(issues[0].reason, SkipReason::MalformedJson);
  }

  #[test]
  fn empty_and_zero_values_are_never_stored() {
    let raw = raw_product(vec![
      metafield("fluorescence", json!("   ")),
      metafield("carat", json!(0)),
    ]);
    let (record, issues) = normalize(&raw, REGISTRY, None).unwrap();

    assert_eq!(record.fluorescence, None);
    assert_eq!(record.carat, None);
    assert_eq!(issues.len(), 2);
    assert!(issues.iter().all(|i| i.reason == SkipReason::Empty));
  }

  #[test]
  fn base_fields_survive_without_metafields() {
    let raw = RawProduct {
      id: "gid://shopify/Product/2".into(),
      created_at: Some("2024-06-01T12:00:00Z".into()),
      price_amount: Some("abc".into()),
      collections: vec![
        CollectionRef {
          id:     "gid://shopify/Collection/9".into(),
          handle: Some("rings".into()),
        },
        CollectionRef { id: "gid://shopify/Collection/10".into(), handle: None },
      ],
      options: vec![ProductOption {
        name:   "Size".into(),
        values: vec!["5".into(), "6".into()],
      }],
      ..RawProduct::default()
    };
    let (record, _) = normalize(&raw, REGISTRY, None).unwrap();

    assert!(record.created_at.is_some());
    assert_eq!(record.price_amount, None);
    assert_eq!(record.collections.len(), 2);
    assert_eq!(record.collection_handles, vec!["rings".to_owned()]);
    assert_eq!(record.option_values, vec!["5".to_owned(), "6".to_owned()]);
  }

  #[test]
  fn observation_log_deduplicates_raw_values() {
    let mut log = ValueObservationLog::default();
    let raw = raw_product(vec![metafield("style", json!("  halo "))]);

    normalize(&raw, REGISTRY, Some(&mut log)).unwrap();
    normalize(&raw, REGISTRY, Some(&mut log)).unwrap();

    let seen = log.values("style").unwrap();
    assert_eq!(seen.len(), 1);
    // Raw pre-normalization value, not the decoded one.
    assert!(seen.contains("\"  halo \""));
  }
}
