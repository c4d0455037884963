//! Encoding and decoding helpers between Rust domain types and the column
//! representations stored in SQLite.
//!
//! Timestamps are stored as RFC 3339 strings; set-valued fields as compact
//! JSON arrays. Presence flags are re-derived from the attribute values at
//! encode time, so a record whose flags were never recomputed still lands in
//! the store consistent.

use chrono::{DateTime, Utc};
use prism_core::product::{CatalogRecord, ProductOption};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON arrays ─────────────────────────────────────────────────────────────

pub fn encode_strings(values: &[String]) -> Result<String> {
  Ok(serde_json::to_string(values)?)
}

pub fn decode_strings(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_numbers(values: &[f64]) -> Result<String> {
  Ok(serde_json::to_string(values)?)
}

pub fn decode_numbers(s: &str) -> Result<Vec<f64>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_options(options: &[ProductOption]) -> Result<String> {
  Ok(serde_json::to_string(options)?)
}

pub fn decode_options(s: &str) -> Result<Vec<ProductOption>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// The `products` column list, in the order [`RawProductRow`] reads and the
/// insert statement writes.
pub const COLUMNS: &str = "external_id, title, description, handle, \
   created_at, price_amount, price_currency, collections, \
   collection_handles, options, option_values, style, shape, cut, carat, \
   carat_size, ring_carat, clarity, diamond_color, polish, symmetry, \
   certification, fluorescence, depth, lw_ratio, table_pct, has_style, \
   has_cut, has_shape";

/// Values read directly from a `products` row, before domain decoding.
pub struct RawProductRow {
  pub external_id:        String,
  pub title:              String,
  pub description:        String,
  pub handle:             String,
  pub created_at:         Option<String>,
  pub price_amount:       Option<f64>,
  pub price_currency:     Option<String>,
  pub collections:        String,
  pub collection_handles: String,
  pub options:            String,
  pub option_values:      String,
  pub style:              Option<String>,
  pub shape:              Option<String>,
  pub cut:                Option<String>,
  pub carat:              Option<f64>,
  pub carat_size:         Option<String>,
  pub ring_carat:         Option<String>,
  pub clarity:            Option<String>,
  pub diamond_color:      Option<String>,
  pub polish:             Option<String>,
  pub symmetry:           Option<String>,
  pub certification:      Option<String>,
  pub fluorescence:       Option<String>,
  pub depth:              Option<f64>,
  pub lw_ratio:           Option<f64>,
  pub table_pct:          Option<f64>,
  pub has_style:          bool,
  pub has_cut:            bool,
  pub has_shape:          bool,
}

impl RawProductRow {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawProductRow {
      external_id:        row.get(0)?,
      title:              row.get(1)?,
      description:        row.get(2)?,
      handle:             row.get(3)?,
      created_at:         row.get(4)?,
      price_amount:       row.get(5)?,
      price_currency:     row.get(6)?,
      collections:        row.get(7)?,
      collection_handles: row.get(8)?,
      options:            row.get(9)?,
      option_values:      row.get(10)?,
      style:              row.get(11)?,
      shape:              row.get(12)?,
      cut:                row.get(13)?,
      carat:              row.get(14)?,
      carat_size:         row.get(15)?,
      ring_carat:         row.get(16)?,
      clarity:            row.get(17)?,
      diamond_color:      row.get(18)?,
      polish:             row.get(19)?,
      symmetry:           row.get(20)?,
      certification:      row.get(21)?,
      fluorescence:       row.get(22)?,
      depth:              row.get(23)?,
      lw_ratio:           row.get(24)?,
      table_pct:          row.get(25)?,
      has_style:          row.get(26)?,
      has_cut:            row.get(27)?,
      has_shape:          row.get(28)?,
    })
  }

  pub fn into_record(self) -> Result<CatalogRecord> {
    Ok(CatalogRecord {
      external_id:        self.external_id,
      title:              self.title,
      description:        self.description,
      handle:             self.handle,
      created_at:         self.created_at.as_deref().map(decode_dt).transpose()?,
      price_amount:       self.price_amount,
      price_currency:     self.price_currency,
      collections:        decode_strings(&self.collections)?,
      collection_handles: decode_strings(&self.collection_handles)?,
      options:            decode_options(&self.options)?,
      option_values:      decode_strings(&self.option_values)?,
      style:              self.style,
      shape:              self.shape,
      cut:                self.cut,
      carat:              self.carat,
      carat_size:         self.carat_size.as_deref().map(decode_numbers).transpose()?,
      clarity:            self.clarity,
      diamond_color:      self.diamond_color,
      polish:             self.polish,
      symmetry:           self.symmetry,
      certification:      self.certification,
      ring_carat:         self.ring_carat.as_deref().map(decode_numbers).transpose()?,
      depth:              self.depth,
      lw_ratio:           self.lw_ratio,
      fluorescence:       self.fluorescence,
      table:              self.table_pct,
      has_style:          self.has_style,
      has_cut:            self.has_cut,
      has_shape:          self.has_shape,
    })
  }
}

/// Encode one record as the parameter vector matching [`COLUMNS`].
///
/// Presence flags are derived here from the attribute values — the write
/// path, not the caller, owns the flag invariant.
pub fn encode_record(
  record: &CatalogRecord,
) -> Result<Vec<rusqlite::types::Value>> {
  use rusqlite::types::Value;

  let opt_text = |v: &Option<String>| match v {
    Some(s) => Value::Text(s.clone()),
    None => Value::Null,
  };
  let opt_real = |v: Option<f64>| match v {
    Some(f) => Value::Real(f),
    None => Value::Null,
  };
  let present =
    |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());

  Ok(vec![
    Value::Text(record.external_id.clone()),
    Value::Text(record.title.clone()),
    Value::Text(record.description.clone()),
    Value::Text(record.handle.clone()),
    match record.created_at {
      Some(dt) => Value::Text(encode_dt(dt)),
      None => Value::Null,
    },
    opt_real(record.price_amount),
    opt_text(&record.price_currency),
    Value::Text(encode_strings(&record.collections)?),
    Value::Text(encode_strings(&record.collection_handles)?),
    Value::Text(encode_options(&record.options)?),
    Value::Text(encode_strings(&record.option_values)?),
    opt_text(&record.style),
    opt_text(&record.shape),
    opt_text(&record.cut),
    opt_real(record.carat),
    match &record.carat_size {
      Some(v) => Value::Text(encode_numbers(v)?),
      None => Value::Null,
    },
    match &record.ring_carat {
      Some(v) => Value::Text(encode_numbers(v)?),
      None => Value::Null,
    },
    opt_text(&record.clarity),
    opt_text(&record.diamond_color),
    opt_text(&record.polish),
    opt_text(&record.symmetry),
    opt_text(&record.certification),
    opt_text(&record.fluorescence),
    opt_real(record.depth),
    opt_real(record.lw_ratio),
    opt_real(record.table),
    Value::Integer(present(&record.style) as i64),
    Value::Integer(present(&record.cut) as i64),
    Value::Integer(present(&record.shape) as i64),
  ])
}
