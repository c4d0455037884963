//! Wire types for the Shopify Admin GraphQL API.
//!
//! Only the fields the pipeline and the read API consume are modelled; the
//! rest of the upstream schema is out of scope. Import-side nodes convert
//! into [`prism_core::normalize::RawProduct`]; live-join nodes pass through
//! to the read API response mostly as-is.

use prism_core::{
  normalize::{CollectionRef, RawMetafield, RawProduct},
  product::ProductOption,
};
use serde::{Deserialize, Serialize};

// ─── Envelope ────────────────────────────────────────────────────────────────

/// The outer GraphQL response: data, errors, and the cost extension.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  pub data:       Option<T>,
  pub errors:     Option<Vec<serde_json::Value>>,
  pub extensions: Option<Extensions>,
}

impl<T> Envelope<T> {
  /// `true` when the response carries a non-empty GraphQL error list.
  pub fn has_errors(&self) -> bool {
    self.errors.as_ref().is_some_and(|e| !e.is_empty())
  }

  pub fn cost(&self) -> Option<&CostInfo> {
    self.extensions.as_ref().and_then(|e| e.cost.as_ref())
  }
}

#[derive(Debug, Deserialize)]
pub struct Extensions {
  pub cost: Option<CostInfo>,
}

/// Per-call query cost telemetry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostInfo {
  pub requested_query_cost: f64,
  /// Absent when the call was throttled before execution.
  pub actual_query_cost:    Option<f64>,
  pub throttle_status:      ThrottleStatus,
}

/// Token-bucket rate-limit snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleStatus {
  pub maximum_available:   f64,
  pub currently_available: f64,
  pub restore_rate:        f64,
}

// ─── Paginated products query ────────────────────────────────────────────────

pub const PRODUCTS_QUERY: &str = "
query getProducts($limit: Int, $cursor: String) {
  products(first: $limit, after: $cursor) {
    nodes {
      id
      metafields(first: 250, namespace: \"custom\") {
        nodes {
          key
          jsonValue
        }
      }
      title
      description
      handle
      createdAt
      priceRangeV2 {
        minVariantPrice {
          amount
          currencyCode
        }
      }
      options {
        name
        values
      }
      collections(first: 250) {
        nodes {
          id
          handle
        }
      }
    }
    pageInfo {
      endCursor
      hasNextPage
    }
  }
}";

#[derive(Debug, Deserialize)]
pub struct ProductsData {
  pub products: Option<ProductConnection>,
}

#[derive(Debug, Deserialize)]
pub struct ProductConnection {
  pub nodes:     Vec<ProductNode>,
  #[serde(rename = "pageInfo")]
  pub page_info: PageInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
  pub end_cursor:    Option<String>,
  pub has_next_page: bool,
}

/// A generic GraphQL node list envelope.
#[derive(Debug, Deserialize)]
pub struct Nodes<T> {
  pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
  pub id:             String,
  pub title:          Option<String>,
  pub description:    Option<String>,
  pub handle:         Option<String>,
  pub created_at:     Option<String>,
  pub price_range_v2: Option<PriceRange>,
  pub collections:    Option<Nodes<CollectionNode>>,
  pub options:        Option<Vec<OptionNode>>,
  pub metafields:     Option<Nodes<MetafieldNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
  pub min_variant_price: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
  pub amount:        Option<String>,
  pub currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionNode {
  pub id:     String,
  pub handle: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OptionNode {
  pub name:   String,
  pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldNode {
  pub key:        String,
  pub json_value: serde_json::Value,
}

impl ProductNode {
  /// Flatten the GraphQL node envelopes into the normalizer's input shape.
  pub fn into_raw(self) -> RawProduct {
    let price = self
      .price_range_v2
      .and_then(|range| range.min_variant_price);

    RawProduct {
      id:             self.id,
      title:          self.title,
      description:    self.description,
      handle:         self.handle,
      created_at:     self.created_at,
      price_amount:   price.as_ref().and_then(|m| m.amount.clone()),
      price_currency: price.and_then(|m| m.currency_code),
      collections:    self
        .collections
        .map(|c| {
          c.nodes
            .into_iter()
            .map(|node| CollectionRef { id: node.id, handle: node.handle })
            .collect()
        })
        .unwrap_or_default(),
      options:        self
        .options
        .map(|opts| {
          opts
            .into_iter()
            .map(|o| ProductOption { name: o.name, values: o.values })
            .collect()
        })
        .unwrap_or_default(),
      metafields:     self
        .metafields
        .map(|m| {
          m.nodes
            .into_iter()
            .map(|node| RawMetafield { key: node.key, value: node.json_value })
            .collect()
        })
        .unwrap_or_default(),
    }
  }
}

// ─── Single-product query (webhook path) ─────────────────────────────────────

pub const PRODUCT_QUERY: &str = "
query getProduct($id: ID!) {
  product(id: $id) {
    id
    metafields(first: 250, namespace: \"custom\") {
      nodes {
        key
        jsonValue
      }
    }
    title
    description
    handle
    createdAt
    priceRangeV2 {
      minVariantPrice {
        amount
        currencyCode
      }
    }
    options {
      name
      values
    }
    collections(first: 250) {
      nodes {
        id
        handle
      }
    }
  }
}";

#[derive(Debug, Deserialize)]
pub struct ProductData {
  pub product: Option<ProductNode>,
}

// ─── Live products-by-ids query (read-API join) ──────────────────────────────

pub const PRODUCTS_BY_IDS_QUERY: &str = "
query getProductsByIds($ids: [ID!]!) {
  nodes(ids: $ids) {
    ... on Product {
      id
      handle
      title
      shape: metafield(namespace: \"custom\", key: \"shape\") { value }
      diamondColor: metafield(namespace: \"custom\", key: \"diamond_color\") { value }
      cut: metafield(namespace: \"custom\", key: \"cut\") { value }
      clarity: metafield(namespace: \"custom\", key: \"clarity\") { value }
      depth: metafield(namespace: \"custom\", key: \"depth\") { value }
      polish: metafield(namespace: \"custom\", key: \"polish\") { value }
      lwRatio: metafield(namespace: \"custom\", key: \"lw_ratio\") { value }
      fluorescence: metafield(namespace: \"custom\", key: \"fluorescence\") { value }
      table: metafield(namespace: \"custom\", key: \"table\") { value }
      symmetry: metafield(namespace: \"custom\", key: \"symmetry\") { value }
      certification: metafield(namespace: \"custom\", key: \"certification\") { value }
      style: metafield(namespace: \"custom\", key: \"style\") { value }
      priceRangeV2 {
        minVariantPrice {
          amount
          currencyCode
        }
      }
      variants(first: 100) {
        nodes {
          id
          title
          availableForSale
          price
          selectedOptions {
            name
            value
          }
        }
      }
    }
  }
}";

#[derive(Debug, Deserialize)]
pub struct LiveNodesData {
  /// One entry per requested id; `None` when the product no longer exists.
  pub nodes: Vec<Option<LiveProduct>>,
}

/// A metafield projected down to its bare value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetafieldValue {
  pub value: Option<String>,
}

/// Live product data fetched at read time, re-serialized into the API
/// response as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveProduct {
  pub id:             String,
  pub handle:         Option<String>,
  pub title:          Option<String>,
  pub shape:          Option<MetafieldValue>,
  pub diamond_color:  Option<MetafieldValue>,
  pub cut:            Option<MetafieldValue>,
  pub clarity:        Option<MetafieldValue>,
  pub depth:          Option<MetafieldValue>,
  pub polish:         Option<MetafieldValue>,
  pub lw_ratio:       Option<MetafieldValue>,
  pub fluorescence:   Option<MetafieldValue>,
  pub table:          Option<MetafieldValue>,
  pub symmetry:       Option<MetafieldValue>,
  pub certification:  Option<MetafieldValue>,
  pub style:          Option<MetafieldValue>,
  pub price_range_v2: Option<LivePriceRange>,
  pub variants:       Option<LiveVariants>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePriceRange {
  pub min_variant_price: Option<Money>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveVariants {
  pub nodes: Vec<LiveVariant>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveVariant {
  pub id:                 String,
  pub title:              Option<String>,
  pub available_for_sale: bool,
  pub price:              Option<String>,
  pub selected_options:   Vec<SelectedOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedOption {
  pub name:  String,
  pub value: String,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn product_node_flattens_into_raw() {
    let node: ProductNode = serde_json::from_value(json!({
      "id": "gid://shopify/Product/1",
      "title": "Halo Ring",
      "handle": "halo-ring",
      "createdAt": "2024-06-01T12:00:00Z",
      "priceRangeV2": {
        "minVariantPrice": { "amount": "1299.00", "currencyCode": "USD" }
      },
      "collections": {
        "nodes": [{ "id": "gid://shopify/Collection/9", "handle": "rings" }]
      },
      "options": [{ "name": "Size", "values": ["5", "6"] }],
      "metafields": {
        "nodes": [{ "key": "style", "jsonValue": "Halo" }]
      }
    }))
    .unwrap();

    let raw = node.into_raw();
    assert_eq!(raw.id, "gid://shopify/Product/1");
    assert_eq!(raw.price_amount.as_deref(), Some("1299.00"));
    assert_eq!(raw.collections[0].handle.as_deref(), Some("rings"));
    assert_eq!(raw.options[0].values, vec!["5", "6"]);
    assert_eq!(raw.metafields[0].key, "style");
  }

  #[test]
  fn envelope_detects_error_lists() {
    let with_errors: Envelope<ProductsData> = serde_json::from_value(json!({
      "errors": [{ "message": "Throttled" }]
    }))
    .unwrap();
    assert!(with_errors.has_errors());
    assert!(with_errors.data.is_none());

    let empty_errors: Envelope<ProductsData> = serde_json::from_value(json!({
      "errors": [],
      "data": { "products": null }
    }))
    .unwrap();
    assert!(!empty_errors.has_errors());
  }

  #[test]
  fn cost_extension_deserializes() {
    let envelope: Envelope<ProductsData> = serde_json::from_value(json!({
      "data": { "products": null },
      "extensions": {
        "cost": {
          "requestedQueryCost": 20.0,
          "actualQueryCost": null,
          "throttleStatus": {
            "maximumAvailable": 1000.0,
            "currentlyAvailable": 10.0,
            "restoreRate": 50.0
          }
        }
      }
    }))
    .unwrap();

    let cost = envelope.cost().unwrap();
    assert_eq!(cost.requested_query_cost, 20.0);
    assert_eq!(cost.actual_query_cost, None);
    assert_eq!(cost.throttle_status.restore_rate, 50.0);
  }
}
