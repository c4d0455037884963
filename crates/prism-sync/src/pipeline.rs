//! Catalog Sync Pipeline — drives the fetch → normalize → persist loop.
//!
//! Strictly sequential: one batch at a time, because cursor advancement and
//! rate pacing both depend on the immediately preceding response. The only
//! suspension points are the per-batch fetch and the pacing sleep, both
//! cooperative awaits.
//!
//! Batch error classification:
//! - GraphQL error payload → skip the page, continue from the cursor the
//!   failed response carried (or retry the last successful one).
//! - Rate-limit signal → flag the run and continue; proactive pacing is
//!   disabled once the flag is set.
//! - Upstream 5xx → stop the loop, keep the progress already persisted.
//! - Anything else → propagate; the run terminates with an error.

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use prism_core::{
  normalize::{ValueObservationLog, normalize},
  schema,
  store::CatalogStore,
};
use tracing::{debug, error, info, warn};

use crate::{
  Error, Result,
  client::{ProductSource, ProductsPage},
  wire::CostInfo,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Run parameters for one sync pass.
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
  /// Products requested per page; `None` uses [`DEFAULT_PAGE_SIZE`].
  pub page_size:         Option<u32>,
  /// Absolute ceiling on fetched batches; `None` uses
  /// [`DEFAULT_MAX_BATCHES`].
  pub max_batches:       Option<u32>,
  /// Opaque cursor to resume from; `None` starts at the beginning.
  pub start_cursor:      Option<String>,
  /// Accumulated batch errors are flushed to the log once this many are
  /// pending; `None` uses [`DEFAULT_ERROR_FLUSH_LIMIT`].
  pub error_flush_limit: Option<usize>,
  /// Cooperative cancellation, checked between batches.
  pub cancel:            Option<Arc<AtomicBool>>,
}

pub const DEFAULT_PAGE_SIZE: u32 = 250;
pub const DEFAULT_MAX_BATCHES: u32 = 200;
pub const DEFAULT_ERROR_FLUSH_LIMIT: usize = 50;

impl SyncConfig {
  fn is_cancelled(&self) -> bool {
    self
      .cancel
      .as_ref()
      .is_some_and(|flag| flag.load(Ordering::Relaxed))
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Terminal report of one sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
  pub batches:           u32,
  pub products_seen:     usize,
  pub products_inserted: usize,
  /// Total batch-level errors absorbed during the run.
  pub errors:            usize,
  /// Whether an explicit rate-limit signal was seen.
  pub rate_limited:      bool,
  /// The 5xx status that stopped the run, if one did.
  pub fatal:             Option<u16>,
  /// Distinct raw metafield values seen, for schema-drift review.
  pub observations:      ValueObservationLog,
}

/// One absorbed batch failure, held in memory until flushed to the log.
#[derive(Debug)]
struct BatchError {
  batch:   u32,
  cursor:  Option<String>,
  message: String,
}

fn flush_errors(pending: &mut Vec<BatchError>) {
  for err in pending.drain(..) {
    warn!(
      batch = err.batch,
      cursor = err.cursor.as_deref().unwrap_or("<start>"),
      "batch error: {}",
      err.message
    );
  }
}

// ─── Pacing ──────────────────────────────────────────────────────────────────

/// Conservative self-throttling: when the tokens on hand are below the cost
/// the next fetch will request, wait `ceil(maximum / restore_rate)` seconds —
/// long enough for the bucket to refill completely. Disabled once an
/// explicit rate-limit signal has been seen (reactive handling has taken
/// over at that point).
pub fn pacing_wait(cost: &CostInfo, rate_limited: bool) -> Option<Duration> {
  if rate_limited {
    return None;
  }
  let throttle = &cost.throttle_status;
  if throttle.restore_rate <= 0.0 {
    return None;
  }
  if throttle.currently_available < cost.requested_query_cost {
    let seconds = (throttle.maximum_available / throttle.restore_rate).ceil();
    return Some(Duration::from_secs_f64(seconds.max(0.0)));
  }
  None
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// The sync pipeline context: the upstream source and the replica store.
/// Owned by the caller; there is no process-wide client or connection state.
pub struct SyncPipeline<F, S> {
  source: F,
  store:  S,
}

impl<F, S> SyncPipeline<F, S>
where
  F: ProductSource,
  S: CatalogStore,
{
  pub fn new(source: F, store: S) -> Self {
    Self { source, store }
  }

  /// Run one sync pass. Returns `Ok` with the terminal report on success,
  /// ceiling, cancellation, or a fatal-but-classified server error; returns
  /// `Err` only for unclassified failures.
  pub async fn run(&self, config: SyncConfig) -> Result<SyncReport> {
    let page_size = config.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let max_batches = config.max_batches.unwrap_or(DEFAULT_MAX_BATCHES);
    let flush_limit = config
      .error_flush_limit
      .unwrap_or(DEFAULT_ERROR_FLUSH_LIMIT);

    let mut cursor = config.start_cursor.clone();
    let mut has_next = true;
    let mut batches = 0u32;
    let mut products_seen = 0usize;
    let mut products_inserted = 0usize;
    let mut total_errors = 0usize;
    let mut rate_limited = false;
    let mut fatal = None;
    let mut observations = ValueObservationLog::default();
    let mut pending_errors: Vec<BatchError> = Vec::new();

    while has_next {
      if config.is_cancelled() {
        info!(batches, "cancellation requested, stopping");
        break;
      }
      batches += 1;
      debug!(batch = batches, cursor = ?cursor, "fetching batch");

      match self.source.products_page(cursor.as_deref(), page_size).await {
        Ok(page) => {
          let ProductsPage { products, cursor: next, has_next_page, cost } =
            page;

          let mut records = Vec::with_capacity(products.len());
          for raw in &products {
            let (record, _issues) =
              normalize(raw, schema::REGISTRY, Some(&mut observations))?;
            records.push(record);
          }

          let outcome = self
            .store
            .insert_missing(&records)
            .await
            .map_err(|e| Error::Store(Box::new(e)))?;
          products_seen += records.len();
          products_inserted += outcome.inserted;

          if next.is_some() {
            cursor = next;
          }
          has_next = has_next_page;

          if let Some(cost) = &cost {
            debug!(
              requested = cost.requested_query_cost,
              actual = ?cost.actual_query_cost,
              available = cost.throttle_status.currently_available,
              "query cost"
            );
            if has_next
              && let Some(wait) = pacing_wait(cost, rate_limited)
            {
              info!(
                seconds = wait.as_secs(),
                "throttle budget low, pacing before next fetch"
              );
              tokio::time::sleep(wait).await;
            }
          }
        }
        Err(Error::Graphql { cursor: next, has_next_page }) => {
          warn!(
            batch = batches,
            "skipping batch: upstream returned an error payload"
          );
          total_errors += 1;
          pending_errors.push(BatchError {
            batch:   batches,
            cursor:  cursor.clone(),
            message: "GraphQL error payload".into(),
          });
          // Advance past the failed page when the response still carried
          // page info; otherwise continue from the last successful cursor.
          if next.is_some() {
            cursor = next;
            has_next = has_next_page;
          }
        }
        Err(Error::RateLimited) => {
          warn!(batch = batches, "upstream rate limit hit");
          total_errors += 1;
          rate_limited = true;
          pending_errors.push(BatchError {
            batch:   batches,
            cursor:  cursor.clone(),
            message: "rate limit (429)".into(),
          });
        }
        Err(Error::Server(status)) => {
          error!(
            batch = batches,
            status, "fatal upstream server error, stopping"
          );
          total_errors += 1;
          pending_errors.push(BatchError {
            batch:   batches,
            cursor:  cursor.clone(),
            message: format!("server error ({status})"),
          });
          fatal = Some(status);
          break;
        }
        Err(other) => {
          flush_errors(&mut pending_errors);
          return Err(other);
        }
      }

      if pending_errors.len() >= flush_limit
        || (!has_next && !pending_errors.is_empty())
      {
        flush_errors(&mut pending_errors);
      }

      if batches >= max_batches {
        info!(max_batches, "batch ceiling reached");
        break;
      }
    }

    flush_errors(&mut pending_errors);

    for key in observations.keys() {
      if let Some(values) = observations.values(key) {
        debug!(key, distinct = values.len(), "observed raw values");
      }
    }
    info!(
      batches,
      products_seen,
      products_inserted,
      errors = total_errors,
      rate_limited,
      "sync finished"
    );

    Ok(SyncReport {
      batches,
      products_seen,
      products_inserted,
      errors: total_errors,
      rate_limited,
      fatal,
      observations,
    })
  }
}
