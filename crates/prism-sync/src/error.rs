//! Error type for `prism-sync`.
//!
//! The variants mirror the pipeline's batch classification: `Graphql` and
//! `RateLimited` are transient (the loop continues), `Server` is fatal (the
//! loop stops, progress is kept), everything else propagates to the caller
//! and terminates the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing or empty credentials/identifiers; raised before any network
  /// call is made.
  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("http transport error: {0}")]
  Http(#[from] reqwest::Error),

  /// Upstream reported throttling (HTTP 429).
  #[error("upstream rate limit hit")]
  RateLimited,

  /// Upstream server failure (5xx). Fatal for a sync run.
  #[error("upstream server error (status {0})")]
  Server(u16),

  /// A non-2xx status outside the rate-limit and server-error classes.
  #[error("unexpected upstream status ({0})")]
  Status(u16),

  /// The response body carried a GraphQL error list or no payload. The page
  /// is skippable; the cursor the failed response carried (if any) lets the
  /// loop move on.
  #[error("upstream returned a GraphQL error payload")]
  Graphql {
    cursor:        Option<String>,
    has_next_page: bool,
  },

  #[error("core error: {0}")]
  Core(#[from] prism_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
