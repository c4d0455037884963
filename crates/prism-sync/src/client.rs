//! Async HTTP client for the Shopify Admin GraphQL API.

use std::{future::Future, time::Duration};

use prism_core::normalize::RawProduct;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::{
  Error, Result,
  wire::{
    CostInfo, Envelope, LiveNodesData, LiveProduct, PRODUCT_QUERY,
    PRODUCTS_BY_IDS_QUERY, PRODUCTS_QUERY, ProductData, ProductNode,
    ProductsData,
  },
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings for the Admin API.
#[derive(Debug, Clone)]
pub struct AdminConfig {
  /// Shop domain, e.g. `my-shop.myshopify.com`.
  pub shop:         String,
  pub access_token: String,
  /// Admin API version, e.g. `2025-01`.
  pub api_version:  String,
}

impl AdminConfig {
  fn validate(&self) -> Result<()> {
    if self.shop.trim().is_empty() {
      return Err(Error::Configuration("shop domain is not set".into()));
    }
    if self.access_token.trim().is_empty() {
      return Err(Error::Configuration("access token is not set".into()));
    }
    if self.api_version.trim().is_empty() {
      return Err(Error::Configuration("api version is not set".into()));
    }
    Ok(())
  }
}

// ─── Fetched page ────────────────────────────────────────────────────────────

/// One page of the paginated products listing, with the call's throttle
/// telemetry attached.
#[derive(Debug)]
pub struct ProductsPage {
  pub products:      Vec<RawProduct>,
  /// Cursor of the next page boundary; `None` on the final page.
  pub cursor:        Option<String>,
  pub has_next_page: bool,
  pub cost:          Option<CostInfo>,
}

// ─── Trait seams ─────────────────────────────────────────────────────────────

/// The paginated-fetch seam consumed by the sync pipeline.
pub trait ProductSource: Send + Sync {
  fn products_page<'a>(
    &'a self,
    cursor: Option<&'a str>,
    page_size: u32,
  ) -> impl Future<Output = Result<ProductsPage>> + Send + 'a;
}

/// The live-data seam consumed by the read API and the webhook handlers.
pub trait LiveCatalog: Send + Sync {
  /// Live product data for the given ids, in no particular order; ids that
  /// no longer exist upstream are simply absent from the result.
  fn products_by_ids<'a>(
    &'a self,
    ids: &'a [String],
  ) -> impl Future<Output = Result<Vec<LiveProduct>>> + Send + 'a;

  /// One product in import shape, or `None` if it no longer exists.
  fn product<'a>(
    &'a self,
    gid: &'a str,
  ) -> impl Future<Output = Result<Option<RawProduct>>> + Send + 'a;
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async client for the Admin GraphQL endpoint.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone, Debug)]
pub struct AdminClient {
  http:   Client,
  config: AdminConfig,
}

impl AdminClient {
  /// Build a client. Fails with [`Error::Configuration`] before any network
  /// traffic when credentials are missing.
  pub fn new(config: AdminConfig) -> Result<Self> {
    config.validate()?;
    let http = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { http, config })
  }

  fn endpoint(&self) -> String {
    format!(
      "https://{}/admin/api/{}/graphql.json",
      self.config.shop, self.config.api_version
    )
  }

  /// Execute one GraphQL call and classify the HTTP status before decoding.
  async fn graphql<T: DeserializeOwned>(
    &self,
    query: &str,
    variables: serde_json::Value,
  ) -> Result<Envelope<T>> {
    let response = self
      .http
      .post(self.endpoint())
      .header("X-Shopify-Access-Token", &self.config.access_token)
      .json(&json!({ "query": query, "variables": variables }))
      .send()
      .await?;

    let status = response.status();
    if status.as_u16() == 429 {
      return Err(Error::RateLimited);
    }
    if status.is_server_error() {
      return Err(Error::Server(status.as_u16()));
    }
    if !status.is_success() {
      return Err(Error::Status(status.as_u16()));
    }

    Ok(response.json().await?)
  }
}

impl ProductSource for AdminClient {
  async fn products_page(
    &self,
    cursor: Option<&str>,
    page_size: u32,
  ) -> Result<ProductsPage> {
    let envelope: Envelope<ProductsData> = self
      .graphql(
        PRODUCTS_QUERY,
        json!({ "cursor": cursor, "limit": page_size }),
      )
      .await?;

    let has_errors = envelope.has_errors();
    let cost = envelope.cost().cloned();
    let connection = envelope.data.and_then(|d| d.products);

    match connection {
      Some(conn) if !has_errors => Ok(ProductsPage {
        products:      conn
          .nodes
          .into_iter()
          .map(ProductNode::into_raw)
          .collect(),
        cursor:        conn.page_info.end_cursor,
        has_next_page: conn.page_info.has_next_page,
        cost,
      }),
      // An error list alongside a payload: skip the page but let the caller
      // advance past it.
      Some(conn) => Err(Error::Graphql {
        cursor:        conn.page_info.end_cursor,
        has_next_page: conn.page_info.has_next_page,
      }),
      None => Err(Error::Graphql { cursor: None, has_next_page: false }),
    }
  }
}

impl LiveCatalog for AdminClient {
  async fn products_by_ids(&self, ids: &[String]) -> Result<Vec<LiveProduct>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }

    let envelope: Envelope<LiveNodesData> = self
      .graphql(PRODUCTS_BY_IDS_QUERY, json!({ "ids": ids }))
      .await?;

    if envelope.has_errors() {
      return Err(Error::Graphql { cursor: None, has_next_page: false });
    }

    Ok(
      envelope
        .data
        .map(|d| d.nodes.into_iter().flatten().collect())
        .unwrap_or_default(),
    )
  }

  async fn product(&self, gid: &str) -> Result<Option<RawProduct>> {
    let envelope: Envelope<ProductData> = self
      .graphql(PRODUCT_QUERY, json!({ "id": gid }))
      .await?;

    if envelope.has_errors() {
      return Err(Error::Graphql { cursor: None, has_next_page: false });
    }

    Ok(
      envelope
        .data
        .and_then(|d| d.product)
        .map(ProductNode::into_raw),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_credentials_fail_before_any_network_call() {
    let err = AdminClient::new(AdminConfig {
      shop:         "".into(),
      access_token: "token".into(),
      api_version:  "2025-01".into(),
    })
    .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let err = AdminClient::new(AdminConfig {
      shop:         "shop.myshopify.com".into(),
      access_token: "  ".into(),
      api_version:  "2025-01".into(),
    })
    .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
  }

  #[test]
  fn endpoint_includes_shop_and_version() {
    let client = AdminClient::new(AdminConfig {
      shop:         "shop.myshopify.com".into(),
      access_token: "token".into(),
      api_version:  "2025-01".into(),
    })
    .unwrap();
    assert_eq!(
      client.endpoint(),
      "https://shop.myshopify.com/admin/api/2025-01/graphql.json"
    );
  }
}
