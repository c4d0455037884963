//! Filter/Sort Query Compiler.
//!
//! Turns the flat string parameters of a catalog request into a typed,
//! immutable [`FilterContext`], then compiles that into a store query
//! (conjunction of predicates), a deterministic multi-key [`SortSpec`], and
//! a [`Page`]. Parsing and compilation are separate, one-directional steps;
//! nothing here mutates shared state.
//!
//! Filters are open-world: an absent or empty filter contributes no
//! predicate, it never means "match nothing".

use serde::Serialize;

// ─── Filter context ──────────────────────────────────────────────────────────

/// The validated, fully-parsed form of a catalog request's parameters.
/// Every field is optional; lists are empty when the filter was not given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterContext {
  pub search: Option<String>,
  pub page:   u32,
  pub limit:  u32,
  /// Present only when both a recognized sort key and a direction were
  /// supplied; a key or a direction alone is discarded.
  pub sort:   Option<SortTerm>,

  /// Collection ids, normalized to canonical GID form.
  pub collections:        Vec<String>,
  pub collection_handles: Vec<String>,
  /// Product ids, normalized to canonical GID form.
  pub ids:                Vec<String>,

  pub style:         Vec<String>,
  pub shape:         Vec<String>,
  pub cut:           Vec<String>,
  pub diamond_color: Vec<String>,
  pub clarity:       Vec<String>,
  pub polish:        Vec<String>,
  pub symmetry:      Vec<String>,
  pub certification: Vec<String>,
  pub fluorescence:  Vec<String>,
  pub ring_carat:    Vec<f64>,
  pub options:       Vec<String>,

  pub carat_min:    Option<f64>,
  pub carat_max:    Option<f64>,
  pub depth_min:    Option<f64>,
  pub depth_max:    Option<f64>,
  pub price_min:    Option<f64>,
  pub price_max:    Option<f64>,
  pub table_min:    Option<f64>,
  pub table_max:    Option<f64>,
  pub lw_ratio_min: Option<f64>,
  pub lw_ratio_max: Option<f64>,
}

impl FilterContext {
  /// Parse raw request parameters (repeated keys allowed, comma-separated
  /// values allowed) into a context. Unknown keys are ignored; malformed
  /// values leave the corresponding field unset.
  pub fn parse(pairs: &[(String, String)]) -> Self {
    let first = |key: &str| {
      pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
    };

    let page = parse_positive_int(first("p")).unwrap_or(1);
    let limit = match parse_positive_int(first("l")) {
      Some(l) if l <= 100 => l,
      _ => 20,
    };

    FilterContext {
      search: first("q")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned),
      page,
      limit,
      sort: parse_sort(first("sb"), first("so")),

      collections: list_values(pairs, "cids", false)
        .iter()
        .filter_map(|id| to_gid("Collection", id))
        .collect(),
      collection_handles: list_values(pairs, "chs", false),
      ids: list_values(pairs, "ids", false)
        .iter()
        .filter_map(|id| to_gid("Product", id))
        .collect(),

      style: list_values(pairs, "style", true),
      shape: list_values(pairs, "shape", true),
      cut: list_values(pairs, "cut", true),
      diamond_color: list_values(pairs, "diamond_color", true),
      clarity: list_values(pairs, "clarity", true),
      polish: list_values(pairs, "polish", true),
      symmetry: list_values(pairs, "symmetry", true),
      certification: list_values(pairs, "certification", true),
      fluorescence: list_values(pairs, "fluorescence", true),
      ring_carat: list_values(pairs, "ring_carat", false)
        .iter()
        .filter_map(|v| parse_finite(v))
        .collect(),
      options: list_values(pairs, "options", true),

      carat_min: parse_number(first("carat_min")),
      carat_max: parse_number(first("carat_max")),
      depth_min: parse_number(first("depth_min")),
      depth_max: parse_number(first("depth_max")),
      price_min: parse_number(first("price_min")),
      price_max: parse_number(first("price_max")),
      table_min: parse_number(first("table_min")),
      table_max: parse_number(first("table_max")),
      lw_ratio_min: parse_number(first("lw_ratio_min")),
      lw_ratio_max: parse_number(first("lw_ratio_max")),
    }
  }
}

// ─── Parameter helpers ───────────────────────────────────────────────────────

/// All values supplied for `key` across repeated parameters and
/// comma-separated lists, trimmed, empty entries dropped.
fn list_values(
  pairs: &[(String, String)],
  key: &str,
  uppercase: bool,
) -> Vec<String> {
  pairs
    .iter()
    .filter(|(k, _)| k == key)
    .flat_map(|(_, v)| v.split(','))
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(|v| {
      if uppercase {
        v.to_uppercase()
      } else {
        v.to_owned()
      }
    })
    .collect()
}

fn parse_positive_int(raw: Option<&str>) -> Option<u32> {
  raw
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .and_then(|s| s.parse::<u32>().ok())
    .filter(|n| *n > 0)
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
  raw.and_then(parse_finite)
}

fn parse_finite(raw: &str) -> Option<f64> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_sort(sb: Option<&str>, so: Option<&str>) -> Option<SortTerm> {
  let key = match sb?.trim() {
    "price" => SortKey::Price,
    "style" => SortKey::Style,
    "cut" => SortKey::Cut,
    "shape" => SortKey::Shape,
    "title" => SortKey::Title,
    "created_at" => SortKey::CreatedAt,
    _ => return None,
  };
  let direction = match so?.trim() {
    "asc" => SortDirection::Asc,
    "desc" => SortDirection::Desc,
    _ => return None,
  };
  Some(SortTerm { key, direction })
}

/// Normalize an identifier to the upstream canonical GID form.
/// Already-canonical ids pass through unchanged.
pub fn to_gid(resource: &str, id: &str) -> Option<String> {
  let id = id.trim();
  if id.is_empty() {
    return None;
  }
  if id.starts_with("gid://shopify/") {
    return Some(id.to_owned());
  }
  Some(format!("gid://shopify/{resource}/{id}"))
}

// ─── Compiled query ──────────────────────────────────────────────────────────

/// Scalar string columns predicates can match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrField {
  ExternalId,
  Style,
  Shape,
  Cut,
  DiamondColor,
  Clarity,
  Polish,
  Symmetry,
  Certification,
  Fluorescence,
}

/// String-set columns (stored as arrays on the record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListField {
  Collections,
  CollectionHandles,
  OptionValues,
}

/// Number-set columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumListField {
  RingCarat,
}

/// Scalar numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumField {
  Carat,
  Depth,
  PriceAmount,
  Table,
  LwRatio,
}

/// One independent predicate; a query is the conjunction of all of its
/// predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
  /// Free-text search over the record's descriptive text.
  Text(String),
  /// Scalar field equals any of the given values.
  AnyOf { field: StrField, values: Vec<String> },
  /// Set-valued field shares at least one member with the given values.
  Intersects { field: ListField, values: Vec<String> },
  IntersectsNumbers {
    field:  NumListField,
    values: Vec<f64>,
  },
  /// Inclusive numeric range; each bound independently optional.
  Range {
    field: NumField,
    min:   Option<f64>,
    max:   Option<f64>,
  },
}

/// A compiled store query. No predicates means "match everything".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
  pub predicates: Vec<Predicate>,
}

// ─── Sort ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
  HasStyle,
  HasCut,
  HasShape,
  Price,
  Style,
  Cut,
  Shape,
  Title,
  CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  Asc,
  Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortTerm {
  pub key:       SortKey,
  pub direction: SortDirection,
}

/// An ordered, deterministic multi-key sort. Earlier terms bind tighter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
  pub terms: Vec<SortTerm>,
}

// ─── Pagination ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub page:  u32,
  pub limit: u32,
}

impl Page {
  pub fn skip(&self) -> u64 {
    (u64::from(self.page) - 1) * u64::from(self.limit)
  }

  pub fn total_pages(&self, total: u64) -> u64 {
    total.div_ceil(u64::from(self.limit))
  }

  pub fn has_next(&self, total: u64) -> bool {
    u64::from(self.page) < self.total_pages(total)
  }

  pub fn has_previous(&self) -> bool {
    self.page > 1
  }
}

// ─── Compilation ─────────────────────────────────────────────────────────────

/// Compile a parsed context into its query, sort, and pagination parts.
pub fn compile(ctx: &FilterContext) -> (ProductQuery, SortSpec, Page) {
  (
    compile_query(ctx),
    compile_sort(ctx.sort.as_ref()),
    Page { page: ctx.page, limit: ctx.limit },
  )
}

/// Build the predicate conjunction. Predicate order is fixed so identical
/// contexts always compile to identical queries.
pub fn compile_query(ctx: &FilterContext) -> ProductQuery {
  let mut predicates = Vec::new();

  if let Some(search) = &ctx.search {
    predicates.push(Predicate::Text(search.clone()));
  }

  let any_of = |field: StrField, values: &Vec<String>| {
    (!values.is_empty()).then(|| Predicate::AnyOf {
      field,
      values: values.clone(),
    })
  };
  let intersects = |field: ListField, values: &Vec<String>| {
    (!values.is_empty()).then(|| Predicate::Intersects {
      field,
      values: values.clone(),
    })
  };
  let range = |field: NumField, min: Option<f64>, max: Option<f64>| {
    (min.is_some() || max.is_some()).then_some(Predicate::Range {
      field,
      min,
      max,
    })
  };

  predicates.extend(any_of(StrField::ExternalId, &ctx.ids));
  predicates.extend(intersects(ListField::Collections, &ctx.collections));
  predicates.extend(intersects(
    ListField::CollectionHandles,
    &ctx.collection_handles,
  ));
  predicates.extend(any_of(StrField::Style, &ctx.style));
  predicates.extend(any_of(StrField::Shape, &ctx.shape));
  predicates.extend(any_of(StrField::Cut, &ctx.cut));
  predicates.extend(any_of(StrField::DiamondColor, &ctx.diamond_color));
  predicates.extend(any_of(StrField::Clarity, &ctx.clarity));
  predicates.extend(any_of(StrField::Polish, &ctx.polish));
  predicates.extend(any_of(StrField::Symmetry, &ctx.symmetry));
  predicates.extend(any_of(StrField::Certification, &ctx.certification));
  predicates.extend(any_of(StrField::Fluorescence, &ctx.fluorescence));
  if !ctx.ring_carat.is_empty() {
    predicates.push(Predicate::IntersectsNumbers {
      field:  NumListField::RingCarat,
      values: ctx.ring_carat.clone(),
    });
  }
  predicates.extend(intersects(ListField::OptionValues, &ctx.options));
  predicates.extend(range(NumField::Carat, ctx.carat_min, ctx.carat_max));
  predicates.extend(range(NumField::Depth, ctx.depth_min, ctx.depth_max));
  predicates.extend(range(NumField::PriceAmount, ctx.price_min, ctx.price_max));
  predicates.extend(range(NumField::Table, ctx.table_min, ctx.table_max));
  predicates.extend(range(
    NumField::LwRatio,
    ctx.lw_ratio_min,
    ctx.lw_ratio_max,
  ));

  ProductQuery { predicates }
}

/// Build the sort order.
///
/// The baseline pushes records missing style/cut/shape to the end — the
/// presence flags sort present-first (flag true before false) — then orders
/// by style, cut, shape ascending. A caller's sort either overwrites one of
/// the baseline attribute keys in place (shape/style/cut) or is prepended as
/// the highest-priority term, leaving the baseline as the deterministic
/// tie-breaker.
pub fn compile_sort(requested: Option<&SortTerm>) -> SortSpec {
  use SortDirection::{Asc, Desc};
  use SortKey::{Cut, HasCut, HasShape, HasStyle, Shape, Style};

  let mut terms = vec![
    SortTerm { key: HasStyle, direction: Desc },
    SortTerm { key: HasCut, direction: Desc },
    SortTerm { key: HasShape, direction: Desc },
    SortTerm { key: Style, direction: Asc },
    SortTerm { key: Cut, direction: Asc },
    SortTerm { key: Shape, direction: Asc },
  ];

  if let Some(req) = requested {
    if matches!(req.key, Shape | Style | Cut) {
      for term in &mut terms {
        if term.key == req.key {
          term.direction = req.direction;
        }
      }
    } else {
      terms.insert(0, *req);
    }
  }

  SortSpec { terms }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pairs(input: &[(&str, &str)]) -> Vec<(String, String)> {
    input
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  // ── Parsing ───────────────────────────────────────────────────────────────

  #[test]
  fn defaults_apply_when_params_are_absent_or_bad() {
    let ctx = FilterContext::parse(&pairs(&[
      ("p", "0"),
      ("l", "abc"),
      ("q", "   "),
    ]));
    assert_eq!(ctx.page, 1);
    assert_eq!(ctx.limit, 20);
    assert_eq!(ctx.search, None);
  }

  #[test]
  fn limit_above_the_bound_falls_back_to_default() {
    let ctx = FilterContext::parse(&pairs(&[("l", "250")]));
    assert_eq!(ctx.limit, 20);

    let ctx = FilterContext::parse(&pairs(&[("l", "100")]));
    assert_eq!(ctx.limit, 100);
  }

  #[test]
  fn multi_value_filters_split_trim_and_uppercase() {
    let ctx = FilterContext::parse(&pairs(&[
      ("style", " halo , round ,"),
      ("style", "pear"),
      ("chs", " rings ,"),
    ]));
    assert_eq!(ctx.style, vec!["HALO", "ROUND", "PEAR"]);
    // Handles keep their case.
    assert_eq!(ctx.collection_handles, vec!["rings"]);
  }

  #[test]
  fn empty_multi_value_filter_is_unset() {
    let ctx = FilterContext::parse(&pairs(&[("cut", " , ,")]));
    assert!(ctx.cut.is_empty());
    assert_eq!(compile_query(&ctx), ProductQuery::default());
  }

  #[test]
  fn identifiers_normalize_to_gid_form() {
    let ctx = FilterContext::parse(&pairs(&[
      ("ids", "123,gid://shopify/Product/456"),
      ("cids", "9"),
    ]));
    assert_eq!(
      ctx.ids,
      vec!["gid://shopify/Product/123", "gid://shopify/Product/456"]
    );
    assert_eq!(ctx.collections, vec!["gid://shopify/Collection/9"]);
  }

  #[test]
  fn ring_carat_values_must_be_numeric() {
    let ctx =
      FilterContext::parse(&pairs(&[("ring_carat", "1.5,two,2.5")]));
    assert_eq!(ctx.ring_carat, vec![1.5, 2.5]);
  }

  #[test]
  fn sort_requires_both_key_and_direction() {
    assert_eq!(FilterContext::parse(&pairs(&[("sb", "price")])).sort, None);
    assert_eq!(FilterContext::parse(&pairs(&[("so", "desc")])).sort, None);
    assert_eq!(
      FilterContext::parse(&pairs(&[("sb", "carat"), ("so", "asc")])).sort,
      None
    );

    let ctx = FilterContext::parse(&pairs(&[("sb", "price"), ("so", "desc")]));
    assert_eq!(
      ctx.sort,
      Some(SortTerm { key: SortKey::Price, direction: SortDirection::Desc })
    );
  }

  // ── Query compilation ─────────────────────────────────────────────────────

  #[test]
  fn no_filters_compile_to_an_empty_conjunction() {
    let ctx = FilterContext::parse(&[]);
    let (query, _, page) = compile(&ctx);
    assert!(query.predicates.is_empty());
    assert_eq!(page, Page { page: 1, limit: 20 });
  }

  #[test]
  fn ranges_keep_each_bound_independent() {
    let ctx = FilterContext::parse(&pairs(&[("carat_min", "1.0")]));
    let query = compile_query(&ctx);
    assert_eq!(
      query.predicates,
      vec![Predicate::Range {
        field: NumField::Carat,
        min:   Some(1.0),
        max:   None,
      }]
    );
  }

  #[test]
  fn identical_contexts_compile_identically() {
    let params = pairs(&[
      ("style", "HALO"),
      ("price_min", "100"),
      ("options", "5,6"),
    ]);
    let a = compile(&FilterContext::parse(&params));
    let b = compile(&FilterContext::parse(&params));
    assert_eq!(a.0, b.0);
    assert_eq!(a.1.terms, b.1.terms);
  }

  // ── Sort compilation ──────────────────────────────────────────────────────

  #[test]
  fn baseline_sort_places_presence_flags_first() {
    let spec = compile_sort(None);
    let keys: Vec<SortKey> = spec.terms.iter().map(|t| t.key).collect();
    assert_eq!(
      keys,
      vec![
        SortKey::HasStyle,
        SortKey::HasCut,
        SortKey::HasShape,
        SortKey::Style,
        SortKey::Cut,
        SortKey::Shape,
      ]
    );
    // Present-first on the flags, ascending on the attributes.
    assert!(
      spec.terms[..3]
        .iter()
        .all(|t| t.direction == SortDirection::Desc)
    );
    assert!(
      spec.terms[3..]
        .iter()
        .all(|t| t.direction == SortDirection::Asc)
    );
  }

  #[test]
  fn attribute_sort_overwrites_in_place() {
    let spec = compile_sort(Some(&SortTerm {
      key:       SortKey::Cut,
      direction: SortDirection::Desc,
    }));
    // Position preserved, direction flipped.
    assert_eq!(spec.terms[4].key, SortKey::Cut);
    assert_eq!(spec.terms[4].direction, SortDirection::Desc);
    assert_eq!(spec.terms.len(), 6);
  }

  #[test]
  fn other_sort_keys_prepend_ahead_of_the_baseline() {
    let spec = compile_sort(Some(&SortTerm {
      key:       SortKey::Price,
      direction: SortDirection::Desc,
    }));
    assert_eq!(spec.terms.len(), 7);
    assert_eq!(spec.terms[0].key, SortKey::Price);
    assert_eq!(spec.terms[0].direction, SortDirection::Desc);
    assert_eq!(spec.terms[1].key, SortKey::HasStyle);
  }

  // ── Pagination ────────────────────────────────────────────────────────────

  #[test]
  fn pagination_arithmetic() {
    let page1 = Page { page: 1, limit: 20 };
    assert_eq!(page1.skip(), 0);
    assert_eq!(page1.total_pages(45), 3);
    assert!(page1.has_next(45));
    assert!(!page1.has_previous());

    let page3 = Page { page: 3, limit: 20 };
    assert_eq!(page3.skip(), 40);
    assert!(!page3.has_next(45));
    assert!(page3.has_previous());
  }
}
