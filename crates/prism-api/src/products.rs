//! Handler for `GET /api/products` — the filtered, paginated catalog view.
//!
//! The replica store answers *which* products match (ids, in a deterministic
//! order) and *how many*; the actual product data is fetched live from the
//! upstream platform at read time and joined back in store order.

use std::collections::HashMap;

use axum::{Json, extract::{Query, State}};
use prism_core::{
  query::{FilterContext, compile},
  store::CatalogStore,
};
use prism_sync::{client::LiveCatalog, wire::LiveProduct};
use serde::Serialize;

use crate::{AppState, error::ApiError};

// ─── Response shape ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
  pub data: ProductsData,
}

#[derive(Debug, Serialize)]
pub struct ProductsData {
  pub nodes:     Vec<LiveProduct>,
  #[serde(rename = "pageInfo")]
  pub page_info: PageMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
  pub page:              u32,
  pub limit:             u32,
  pub total:             u64,
  pub total_pages:       u64,
  pub has_next_page:     bool,
  pub has_previous_page: bool,
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// `GET /api/products?q=…&p=…&l=…&sb=…&so=…&style=…&carat_min=…&…`
pub async fn list<S, L>(
  State(state): State<AppState<S, L>>,
  Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<ProductsResponse>, ApiError>
where
  S: CatalogStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  L: LiveCatalog + Clone + Send + Sync + 'static,
{
  let ctx = FilterContext::parse(&params);
  let (query, sort, page) = compile(&ctx);

  let ids = state
    .store
    .find_ids(&query, &sort, &page)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let total = state
    .store
    .count(&query)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let live = state
    .live
    .products_by_ids(&ids)
    .await
    .map_err(ApiError::Upstream)?;

  // Join back in store order; ids gone upstream are dropped.
  let mut by_id: HashMap<String, LiveProduct> =
    live.into_iter().map(|p| (p.id.clone(), p)).collect();
  let nodes: Vec<LiveProduct> =
    ids.iter().filter_map(|id| by_id.remove(id)).collect();

  Ok(Json(ProductsResponse {
    data: ProductsData {
      nodes,
      page_info: PageMeta {
        page:              page.page,
        limit:             page.limit,
        total,
        total_pages:       page.total_pages(total),
        has_next_page:     page.has_next(total),
        has_previous_page: page.has_previous(),
      },
    },
  }))
}
