//! Field Schema Registry — the static table of normalized metafield keys and
//! their decoding rules.
//!
//! Each upstream metafield the replica cares about has exactly one entry
//! here. The normalizer walks this table; nothing outside it is ever decoded
//! into a [`CatalogRecord`](crate::product::CatalogRecord) attribute.

// ─── Decoding rules ──────────────────────────────────────────────────────────

/// How the raw metafield payload is structurally decoded before typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
  /// Use the value as delivered (strings are trimmed, nothing else).
  Raw,
  /// String payloads carry embedded JSON and must be decoded first.
  Json,
}

/// The type a decoded value must conform to before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
  Text,
  Number,
  NumberList,
}

/// A single decoded attribute value, ready to assign to a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Text(String),
  Number(f64),
  Numbers(Vec<f64>),
}

// ─── Registry entries ────────────────────────────────────────────────────────

/// Decoding rule for one normalized metafield key.
pub struct FieldSchema {
  pub key:        &'static str,
  pub parse:      ParseMode,
  pub value_type: ValueType,
  /// Enumerated legal values; empty when the field is free-form.
  pub allowed:    &'static [&'static str],
}

impl FieldSchema {
  /// `true` when `value` is inside the enumerated set, or the field is
  /// free-form. Unknown values are stored anyway; this exists so callers can
  /// flag schema drift (new enum values appearing upstream).
  pub fn is_known_value(&self, value: &str) -> bool {
    self.allowed.is_empty() || self.allowed.contains(&value)
  }
}

/// All normalized metafield keys, in the order they appear on the record.
pub const REGISTRY: &[FieldSchema] = &[
  FieldSchema {
    key:        "style",
    parse:      ParseMode::Raw,
    value_type: ValueType::Text,
    allowed:    &[
      "ETERNITY",
      "HALO",
      "ROUND",
      "SIDE STONES",
      "SOLITARE",
      "STUDS",
      "HEART",
      "OVAL",
      "CUSHION BRILLIANT",
      "EMERALD",
      "SOLITAIRE",
      "PRINCESS",
      "PEAR",
      "MARQUISE",
      "RADIANT",
      "TOI ET MOI",
      "MULTI-STONE",
      "THREE STONE",
      "ASSCHER",
      "CUSHION MODIFIED",
      "FULL ETERNITY",
      "BANGLE",
    ],
  },
  FieldSchema {
    key:        "shape",
    parse:      ParseMode::Raw,
    value_type: ValueType::Text,
    allowed:    &[
      "RADIANT",
      "CUSHION",
      "ASSCHER",
      "EMERALD",
      "HEART",
      "MARQUISE",
      "OVAL",
      "PEAR",
      "PRINCESS",
      "ROUND",
      "CUSHION BRILLIANT",
      "CUSHION MODIFIED",
    ],
  },
  FieldSchema {
    key:        "cut",
    parse:      ParseMode::Raw,
    value_type: ValueType::Text,
    allowed:    &["EX", "GD", "ID", "VG", "F"],
  },
  FieldSchema {
    key:        "carat",
    parse:      ParseMode::Raw,
    value_type: ValueType::Number,
    allowed:    &[],
  },
  FieldSchema {
    key:        "carat_size",
    parse:      ParseMode::Json,
    value_type: ValueType::NumberList,
    allowed:    &[],
  },
  FieldSchema {
    key:        "clarity",
    parse:      ParseMode::Raw,
    value_type: ValueType::Text,
    allowed:    &["IF", "FL", "VS1", "VS2", "VS+", "VVS1", "VVS2"],
  },
  FieldSchema {
    key:        "diamond_color",
    parse:      ParseMode::Raw,
    value_type: ValueType::Text,
    allowed:    &["D", "E", "F", "F-G", "G", "E-F-G"],
  },
  FieldSchema {
    key:        "polish",
    parse:      ParseMode::Raw,
    value_type: ValueType::Text,
    allowed:    &["EX", "GD", "VG"],
  },
  FieldSchema {
    key:        "symmetry",
    parse:      ParseMode::Raw,
    value_type: ValueType::Text,
    allowed:    &["EX", "GD", "VG"],
  },
  FieldSchema {
    key:        "certification",
    parse:      ParseMode::Raw,
    value_type: ValueType::Text,
    allowed:    &["IGI", "GIA"],
  },
  FieldSchema {
    key:        "ring_carat",
    parse:      ParseMode::Json,
    value_type: ValueType::NumberList,
    allowed:    &[],
  },
  FieldSchema {
    key:        "depth",
    parse:      ParseMode::Raw,
    value_type: ValueType::Number,
    allowed:    &[],
  },
  FieldSchema {
    key:        "lw_ratio",
    parse:      ParseMode::Raw,
    value_type: ValueType::Number,
    allowed:    &[],
  },
  FieldSchema {
    key:        "fluorescence",
    parse:      ParseMode::Raw,
    value_type: ValueType::Text,
    allowed:    &[],
  },
  FieldSchema {
    key:        "table",
    parse:      ParseMode::Raw,
    value_type: ValueType::Number,
    allowed:    &[],
  },
];

/// Look up the registry entry for `key`.
pub fn lookup(key: &str) -> Option<&'static FieldSchema> {
  REGISTRY.iter().find(|f| f.key == key)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn registry_keys_are_unique() {
    for (i, field) in REGISTRY.iter().enumerate() {
      assert!(
        REGISTRY[i + 1..].iter().all(|other| other.key != field.key),
        "duplicate registry key {:?}",
        field.key
      );
    }
  }

  #[test]
  fn enumerated_values_detect_drift() {
    let cut = lookup("cut").unwrap();
    assert!(cut.is_known_value("EX"));
    assert!(!cut.is_known_value("SUPERB"));

    // Free-form fields accept anything.
    let fluorescence = lookup("fluorescence").unwrap();
    assert!(fluorescence.is_known_value("MEDIUM BLUE"));
  }
}
