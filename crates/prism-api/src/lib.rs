//! JSON read API for the prism catalog replica.
//!
//! Exposes an axum [`Router`] backed by any
//! [`prism_core::store::CatalogStore`] plus a live upstream source. The
//! store answers which products match a query; the upstream source supplies
//! the product data joined into the response at read time.

pub mod error;
pub mod events;
pub mod import;
pub mod products;

use axum::{
  Router,
  routing::{get, post},
};
use prism_core::store::CatalogStore;
use prism_sync::client::{LiveCatalog, ProductSource};

pub use error::ApiError;

/// Shared state threaded through all handlers. Both halves are cheaply
/// clonable; lifecycle is owned by the caller, not by process-wide
/// singletons.
#[derive(Clone)]
pub struct AppState<S, L> {
  pub store: S,
  pub live:  L,
}

/// Build a fully-materialised router for the given state.
pub fn router<S, L>(state: AppState<S, L>) -> Router
where
  S: CatalogStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  L: LiveCatalog + ProductSource + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/api/products", get(products::list::<S, L>))
    .route("/api/import", post(import::trigger::<S, L>))
    .route(
      "/webhooks/products/create",
      post(events::product_created::<S, L>),
    )
    .route(
      "/webhooks/products/delete",
      post(events::product_deleted::<S, L>),
    )
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
