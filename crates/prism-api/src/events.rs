//! Handlers for upstream product create/delete events.
//!
//! Both are idempotent against repeated delivery: a create for an id the
//! replica already holds is a no-op 200, a delete for an id the replica does
//! not hold is a 404 with no state change. Webhook signature verification is
//! the transport layer's concern, not handled here.

use axum::{Json, extract::State, http::StatusCode};
use prism_core::{normalize::normalize, query::to_gid, schema, store::CatalogStore};
use prism_sync::client::LiveCatalog;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{AppState, error::ApiError};

// ─── Payloads ────────────────────────────────────────────────────────────────

/// The slice of the upstream webhook payload these handlers consume. The id
/// arrives either as a ready-made GID or as a bare numeric id.
#[derive(Debug, Deserialize)]
pub struct ProductEvent {
  pub admin_graphql_api_id: Option<String>,
  pub id:                   Option<Value>,
}

impl ProductEvent {
  fn gid(&self) -> Option<String> {
    if let Some(gid) = &self.admin_graphql_api_id {
      return to_gid("Product", gid);
    }
    let id = match self.id.as_ref()? {
      Value::String(s) => s.clone(),
      Value::Number(n) => n.to_string(),
      _ => return None,
    };
    to_gid("Product", &id)
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /webhooks/products/create` — fetch the product live, normalize it,
/// and insert it unless the replica already holds it.
pub async fn product_created<S, L>(
  State(state): State<AppState<S, L>>,
  Json(payload): Json<ProductEvent>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  L: LiveCatalog + Clone + Send + Sync + 'static,
{
  let gid = payload
    .gid()
    .ok_or_else(|| ApiError::BadRequest("missing product id".into()))?;

  let raw = state
    .live
    .product(&gid)
    .await
    .map_err(ApiError::Upstream)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("product {gid} not found upstream"))
    })?;

  let (record, _issues) = normalize(&raw, schema::REGISTRY, None)
    .map_err(|e| ApiError::Internal(Box::new(e)))?;

  let inserted = state
    .store
    .insert_if_absent(&record)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  if inserted {
    info!(%gid, "product created in replica");
    Ok(StatusCode::CREATED)
  } else {
    info!(%gid, "product already present, create ignored");
    Ok(StatusCode::OK)
  }
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `POST /webhooks/products/delete` — remove the product from the replica.
pub async fn product_deleted<S, L>(
  State(state): State<AppState<S, L>>,
  Json(payload): Json<ProductEvent>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  L: LiveCatalog + Clone + Send + Sync + 'static,
{
  let gid = payload
    .gid()
    .ok_or_else(|| ApiError::BadRequest("missing product id".into()))?;

  let removed = state
    .store
    .delete(&gid)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  if removed {
    info!(%gid, "product deleted from replica");
    Ok(StatusCode::OK)
  } else {
    Err(ApiError::NotFound(format!("product {gid} not in replica")))
  }
}
