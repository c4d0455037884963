//! Error types for `prism-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown attribute key: {0:?}")]
  UnknownAttribute(String),

  #[error("attribute {key:?} cannot hold a {kind} value")]
  AttributeMismatch { key: String, kind: &'static str },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
