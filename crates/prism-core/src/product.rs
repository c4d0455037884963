//! Catalog record types — the persisted unit of the prism replica.
//!
//! A [`CatalogRecord`] mirrors one upstream product. Identity is the
//! upstream-issued `external_id`; everything else is descriptive and may be
//! rewritten by a later sync pass. Records are written create-only, so a
//! re-import never clobbers an existing row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  error::Error,
  schema::FieldValue,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// A configurable variant axis (e.g. "Ring Size" and its value set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
  pub name:   String,
  pub values: Vec<String>,
}

// ─── CatalogRecord ───────────────────────────────────────────────────────────

/// One product in the local replica.
///
/// The normalized attribute fields are each optional: a field is present only
/// when the upstream metafield decoded cleanly, never as a sentinel. The
/// `has_*` flags are derived, recomputed whenever style/cut/shape change, and
/// exist purely to bias missing-attribute records to the end of a sort order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
  /// Upstream-issued product identifier; unique across the replica.
  pub external_id:        String,
  pub title:              String,
  pub description:        String,
  pub handle:             String,
  pub created_at:         Option<DateTime<Utc>>,
  pub price_amount:       Option<f64>,
  pub price_currency:     Option<String>,
  /// Collection membership identifiers; insertion order irrelevant.
  pub collections:        Vec<String>,
  /// Human-readable twin of `collections`.
  pub collection_handles: Vec<String>,
  pub options:            Vec<ProductOption>,
  /// All option values flattened, denormalized for filtering.
  pub option_values:      Vec<String>,

  // ── Normalized attributes ───────────────────────────────────────────────
  pub style:         Option<String>,
  pub shape:         Option<String>,
  pub cut:           Option<String>,
  pub carat:         Option<f64>,
  pub carat_size:    Option<Vec<f64>>,
  pub clarity:       Option<String>,
  pub diamond_color: Option<String>,
  pub polish:        Option<String>,
  pub symmetry:      Option<String>,
  pub certification: Option<String>,
  pub ring_carat:    Option<Vec<f64>>,
  pub depth:         Option<f64>,
  pub lw_ratio:      Option<f64>,
  pub fluorescence:  Option<String>,
  pub table:         Option<f64>,

  // ── Derived presence flags (sort placement only) ────────────────────────
  pub has_style: bool,
  pub has_cut:   bool,
  pub has_shape: bool,
}

impl CatalogRecord {
  /// Re-derive the presence flags from the current attribute values.
  ///
  /// Invariant: a flag is `true` iff the corresponding attribute is present
  /// and non-empty. Called after every attribute assignment; the SQLite
  /// store re-derives the flags again at encode time, so no write path can
  /// desynchronize them.
  pub fn recompute_presence_flags(&mut self) {
    self.has_style = self.style.as_deref().is_some_and(|s| !s.is_empty());
    self.has_cut = self.cut.as_deref().is_some_and(|s| !s.is_empty());
    self.has_shape = self.shape.as_deref().is_some_and(|s| !s.is_empty());
  }

  /// Assign a decoded attribute by its registry key.
  ///
  /// Errors on a key the registry does not declare, or a value whose type
  /// does not match the field (both indicate a registry/record mismatch, not
  /// bad upstream data — bad data is skipped before this point).
  pub fn set_attribute(&mut self, key: &str, value: FieldValue) -> Result<()> {
    match (key, value) {
      ("style", FieldValue::Text(v)) => self.style = Some(v),
      ("shape", FieldValue::Text(v)) => self.shape = Some(v),
      ("cut", FieldValue::Text(v)) => self.cut = Some(v),
      ("carat", FieldValue::Number(v)) => self.carat = Some(v),
      ("carat_size", FieldValue::Numbers(v)) => self.carat_size = Some(v),
      ("clarity", FieldValue::Text(v)) => self.clarity = Some(v),
      ("diamond_color", FieldValue::Text(v)) => self.diamond_color = Some(v),
      ("polish", FieldValue::Text(v)) => self.polish = Some(v),
      ("symmetry", FieldValue::Text(v)) => self.symmetry = Some(v),
      ("certification", FieldValue::Text(v)) => self.certification = Some(v),
      ("ring_carat", FieldValue::Numbers(v)) => self.ring_carat = Some(v),
      ("depth", FieldValue::Number(v)) => self.depth = Some(v),
      ("lw_ratio", FieldValue::Number(v)) => self.lw_ratio = Some(v),
      ("fluorescence", FieldValue::Text(v)) => self.fluorescence = Some(v),
      ("table", FieldValue::Number(v)) => self.table = Some(v),
      (key, value) => {
        let kind = match value {
          FieldValue::Text(_) => "text",
          FieldValue::Number(_) => "number",
          FieldValue::Numbers(_) => "number list",
        };
        return if crate::schema::lookup(key).is_some() {
          Err(Error::AttributeMismatch { key: key.to_owned(), kind })
        } else {
          Err(Error::UnknownAttribute(key.to_owned()))
        };
      }
    }
    self.recompute_presence_flags();
    Ok(())
  }
}
