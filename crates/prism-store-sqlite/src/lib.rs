//! SQLite backend for the prism catalog replica.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Compiled queries from
//! `prism-core` are rendered to SQL here; set-membership predicates use the
//! bundled SQLite's JSON1 `json_each`.

mod encode;
mod schema;
mod sql;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
