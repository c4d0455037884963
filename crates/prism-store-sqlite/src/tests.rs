//! Integration tests for `SqliteStore` against an in-memory database.

use prism_core::{
  product::{CatalogRecord, ProductOption},
  query::{FilterContext, Page, ProductQuery, compile},
  store::CatalogStore,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn record(id: u64) -> CatalogRecord {
  let mut record = CatalogRecord {
    external_id: format!("gid://shopify/Product/{id}"),
    title: format!("Ring {id}"),
    handle: format!("ring-{id}"),
    price_amount: Some(100.0 + id as f64),
    price_currency: Some("USD".into()),
    ..CatalogRecord::default()
  };
  record.recompute_presence_flags();
  record
}

fn styled_record(id: u64, style: &str, cut: &str, shape: &str) -> CatalogRecord {
  let mut record = record(id);
  record.style = Some(style.to_owned());
  record.cut = Some(cut.to_owned());
  record.shape = Some(shape.to_owned());
  record.recompute_presence_flags();
  record
}

fn all() -> ProductQuery {
  ProductQuery::default()
}

fn parse(params: &[(&str, &str)]) -> FilterContext {
  let pairs: Vec<(String, String)> = params
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
  FilterContext::parse(&pairs)
}

async fn find_all_ids(store: &SqliteStore, params: &[(&str, &str)]) -> Vec<String> {
  let (query, sort, _) = compile(&parse(params));
  store
    .find_ids(&query, &sort, &Page { page: 1, limit: 100 })
    .await
    .unwrap()
}

// ─── Create-only inserts ─────────────────────────────────────────────────────

#[tokio::test]
async fn insert_missing_is_idempotent() {
  let s = store().await;
  let records: Vec<CatalogRecord> = (1..=5).map(record).collect();

  let first = s.insert_missing(&records).await.unwrap();
  assert_eq!(first.inserted, 5);
  assert_eq!(first.skipped, 0);

  // Re-running the same batch neither duplicates nor clobbers.
  let second = s.insert_missing(&records).await.unwrap();
  assert_eq!(second.inserted, 0);
  assert_eq!(second.skipped, 5);

  assert_eq!(s.count(&all()).await.unwrap(), 5);
}

#[tokio::test]
async fn insert_missing_never_overwrites() {
  let s = store().await;
  let original = record(1);
  s.insert_missing(std::slice::from_ref(&original)).await.unwrap();

  let mut changed = record(1);
  changed.title = "Renamed".into();
  s.insert_missing(&[changed]).await.unwrap();

  let stored = s.get(&original.external_id).await.unwrap().unwrap();
  assert_eq!(stored.title, original.title);
}

#[tokio::test]
async fn insert_if_absent_reports_whether_it_inserted() {
  let s = store().await;
  let r = record(7);

  assert!(s.insert_if_absent(&r).await.unwrap());
  assert!(!s.insert_if_absent(&r).await.unwrap());
  assert_eq!(s.count(&all()).await.unwrap(), 1);
}

// ─── Round-trip ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_record_roundtrip() {
  let s = store().await;
  let mut r = styled_record(1, "HALO", "EX", "OVAL");
  r.created_at = Some(chrono::Utc::now());
  r.collections = vec!["gid://shopify/Collection/1".into()];
  r.collection_handles = vec!["rings".into()];
  r.options = vec![ProductOption {
    name:   "Size".into(),
    values: vec!["5".into(), "6".into()],
  }];
  r.option_values = vec!["5".into(), "6".into()];
  r.carat = Some(1.25);
  r.carat_size = Some(vec![1.0, 1.5]);
  r.ring_carat = Some(vec![0.5]);
  r.clarity = Some("VS1".into());
  r.table = Some(57.0);

  s.insert_if_absent(&r).await.unwrap();
  let stored = s.get(&r.external_id).await.unwrap().unwrap();

  assert_eq!(stored.style, r.style);
  assert_eq!(stored.options, r.options);
  assert_eq!(stored.carat_size, r.carat_size);
  assert_eq!(stored.ring_carat, r.ring_carat);
  assert_eq!(stored.table, r.table);
  assert!(stored.has_style && stored.has_cut && stored.has_shape);
}

#[tokio::test]
async fn presence_flags_are_derived_at_write_time() {
  let s = store().await;
  // A record whose flags were never recomputed still stores them correctly.
  let r = CatalogRecord {
    external_id: "gid://shopify/Product/9".into(),
    style: Some("HALO".into()),
    ..CatalogRecord::default()
  };
  assert!(!r.has_style);

  s.insert_if_absent(&r).await.unwrap();
  let stored = s.get(&r.external_id).await.unwrap().unwrap();
  assert!(stored.has_style);
  assert!(!stored.has_cut && !stored.has_shape);
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_is_idempotent() {
  let s = store().await;
  let r = record(1);
  s.insert_if_absent(&r).await.unwrap();

  assert!(s.delete(&r.external_id).await.unwrap());
  assert!(!s.delete(&r.external_id).await.unwrap());
  assert_eq!(s.get(&r.external_id).await.unwrap(), None);
}

// ─── Filtering ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn open_world_queries_return_everything() {
  let s = store().await;
  s.insert_missing(&[
    styled_record(1, "HALO", "EX", "OVAL"),
    record(2),
    styled_record(3, "PEAR", "VG", "ROUND"),
  ])
  .await
  .unwrap();

  // No filters at all.
  assert_eq!(find_all_ids(&s, &[]).await.len(), 3);

  // An empty multi-value filter behaves identically to omitting it.
  assert_eq!(find_all_ids(&s, &[("style", " , ")]).await.len(), 3);
}

#[tokio::test]
async fn categorical_filters_match_any_value() {
  let s = store().await;
  s.insert_missing(&[
    styled_record(1, "HALO", "EX", "OVAL"),
    styled_record(2, "PEAR", "VG", "ROUND"),
    styled_record(3, "ETERNITY", "GD", "PEAR"),
  ])
  .await
  .unwrap();

  let ids = find_all_ids(&s, &[("style", "halo,pear")]).await;
  assert_eq!(ids.len(), 2);

  let ids = find_all_ids(&s, &[("style", "HALO"), ("cut", "VG")]).await;
  assert!(ids.is_empty());
}

#[tokio::test]
async fn numeric_ranges_are_inclusive_and_independent() {
  let s = store().await;
  let mut records = Vec::new();
  for (id, carat) in [(1, 0.5), (2, 1.0), (3, 1.5), (4, 2.0)] {
    let mut r = record(id);
    r.carat = Some(carat);
    records.push(r);
  }
  s.insert_missing(&records).await.unwrap();

  assert_eq!(find_all_ids(&s, &[("carat_min", "1.0")]).await.len(), 3);
  assert_eq!(find_all_ids(&s, &[("carat_max", "1.0")]).await.len(), 2);
  assert_eq!(
    find_all_ids(&s, &[("carat_min", "1.0"), ("carat_max", "1.5")])
      .await
      .len(),
    2
  );
}

#[tokio::test]
async fn set_membership_filters_intersect() {
  let s = store().await;
  let mut a = record(1);
  a.collections = vec!["gid://shopify/Collection/10".into()];
  a.option_values = vec!["5".into()];
  let mut b = record(2);
  b.collections = vec!["gid://shopify/Collection/20".into()];
  b.option_values = vec!["6".into(), "7".into()];
  s.insert_missing(&[a, b]).await.unwrap();

  let ids = find_all_ids(&s, &[("cids", "10")]).await;
  assert_eq!(ids, vec!["gid://shopify/Product/1"]);

  let ids = find_all_ids(&s, &[("options", "7,9")]).await;
  assert_eq!(ids, vec!["gid://shopify/Product/2"]);
}

#[tokio::test]
async fn ring_carat_membership_is_numeric() {
  let s = store().await;
  let mut r = record(1);
  r.ring_carat = Some(vec![0.5, 1.0]);
  s.insert_missing(std::slice::from_ref(&r)).await.unwrap();
  s.insert_missing(&[record(2)]).await.unwrap();

  let ids = find_all_ids(&s, &[("ring_carat", "1.0")]).await;
  assert_eq!(ids, vec![r.external_id.clone()]);

  let ids = find_all_ids(&s, &[("ring_carat", "2.0")]).await;
  assert!(ids.is_empty());
}

#[tokio::test]
async fn text_search_matches_title_description_and_handle() {
  let s = store().await;
  let mut a = record(1);
  a.description = "A brilliant eternity band".into();
  s.insert_missing(&[a, record(2)]).await.unwrap();

  let ids = find_all_ids(&s, &[("q", "eternity")]).await;
  assert_eq!(ids, vec!["gid://shopify/Product/1"]);
}

// ─── Sorting ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn default_sort_is_deterministic_and_pushes_missing_style_last() {
  let s = store().await;
  s.insert_missing(&[
    record(1), // no style
    styled_record(2, "PEAR", "EX", "OVAL"),
    styled_record(3, "HALO", "EX", "OVAL"),
    record(4), // no style
  ])
  .await
  .unwrap();

  let first = find_all_ids(&s, &[]).await;
  let second = find_all_ids(&s, &[]).await;
  assert_eq!(first, second);

  // Styled records first (flags ascending), then by style ascending.
  assert_eq!(
    first,
    vec![
      "gid://shopify/Product/3", // HALO
      "gid://shopify/Product/2", // PEAR
      "gid://shopify/Product/1",
      "gid://shopify/Product/4",
    ]
  );
}

#[tokio::test]
async fn requested_sort_prepends_but_keeps_the_baseline_tiebreak() {
  let s = store().await;
  let mut cheap = styled_record(1, "HALO", "EX", "OVAL");
  cheap.price_amount = Some(50.0);
  let mut dear = styled_record(2, "ASSCHER", "EX", "OVAL");
  dear.price_amount = Some(500.0);
  let mut mid = styled_record(3, "PEAR", "EX", "OVAL");
  mid.price_amount = Some(250.0);
  s.insert_missing(&[cheap, dear, mid]).await.unwrap();

  let ids =
    find_all_ids(&s, &[("sb", "price"), ("so", "desc")]).await;
  assert_eq!(
    ids,
    vec![
      "gid://shopify/Product/2",
      "gid://shopify/Product/3",
      "gid://shopify/Product/1",
    ]
  );
}

#[tokio::test]
async fn attribute_sort_overrides_direction_in_place() {
  let s = store().await;
  s.insert_missing(&[
    styled_record(1, "HALO", "EX", "OVAL"),
    styled_record(2, "PEAR", "EX", "OVAL"),
  ])
  .await
  .unwrap();

  let ids = find_all_ids(&s, &[("sb", "style"), ("so", "desc")]).await;
  assert_eq!(
    ids,
    vec!["gid://shopify/Product/2", "gid://shopify/Product/1"]
  );
}

// ─── Pagination ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn pagination_windows_are_exact() {
  let s = store().await;
  let records: Vec<CatalogRecord> = (1..=45).map(record).collect();
  s.insert_missing(&records).await.unwrap();

  let (query, sort, _) = compile(&parse(&[]));

  let page1 = s
    .find_ids(&query, &sort, &Page { page: 1, limit: 20 })
    .await
    .unwrap();
  let page3 = s
    .find_ids(&query, &sort, &Page { page: 3, limit: 20 })
    .await
    .unwrap();

  assert_eq!(page1.len(), 20);
  assert_eq!(page3.len(), 5);
  assert_eq!(s.count(&query).await.unwrap(), 45);

  // Windows never overlap.
  assert!(page1.iter().all(|id| !page3.contains(id)));
}
