//! Handler for `POST /api/import` — trigger a sync run in the background.

use axum::{Json, extract::State, http::StatusCode};
use prism_core::store::CatalogStore;
use prism_sync::{SyncConfig, SyncPipeline, client::ProductSource};
use serde::Deserialize;
use tracing::{error, info};

use crate::AppState;

/// Optional overrides for the triggered run.
#[derive(Debug, Default, Deserialize)]
pub struct ImportRequest {
  pub page_size:    Option<u32>,
  pub max_batches:  Option<u32>,
  pub start_cursor: Option<String>,
}

/// Spawns the run and returns 202 immediately; progress and the terminal
/// report land in the log.
pub async fn trigger<S, L>(
  State(state): State<AppState<S, L>>,
  Json(request): Json<ImportRequest>,
) -> StatusCode
where
  S: CatalogStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  L: ProductSource + Clone + Send + Sync + 'static,
{
  let pipeline = SyncPipeline::new(state.live.clone(), state.store.clone());

  tokio::spawn(async move {
    let config = SyncConfig {
      page_size: request.page_size,
      max_batches: request.max_batches,
      start_cursor: request.start_cursor,
      ..SyncConfig::default()
    };
    match pipeline.run(config).await {
      Ok(report) => info!(
        batches = report.batches,
        inserted = report.products_inserted,
        errors = report.errors,
        rate_limited = report.rate_limited,
        "import finished"
      ),
      Err(e) => error!(error = %e, "import failed"),
    }
  });

  StatusCode::ACCEPTED
}
