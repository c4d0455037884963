//! Shopify Admin API client and catalog sync pipeline for prism.
//!
//! The [`client::AdminClient`] speaks the Admin GraphQL API and surfaces the
//! cost/throttle telemetry each call returns. The [`pipeline::SyncPipeline`]
//! drives the fetch → normalize → persist loop that populates the replica
//! store, owning retry/backoff classification and rate pacing.

pub mod client;
pub mod error;
pub mod pipeline;
pub mod wire;

pub use client::{AdminClient, AdminConfig, LiveCatalog, ProductSource};
pub use error::{Error, Result};
pub use pipeline::{SyncConfig, SyncPipeline, SyncReport};
