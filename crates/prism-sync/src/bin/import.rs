//! Catalog import binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite replica, and runs one sync pass against the Shopify Admin API.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use prism_store_sqlite::SqliteStore;
use prism_sync::{
  AdminClient, AdminConfig, SyncConfig, SyncPipeline,
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "prism catalog import")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Products to request per page.
  #[arg(long)]
  page_size: Option<u32>,

  /// Absolute ceiling on fetched batches.
  #[arg(long)]
  max_batches: Option<u32>,

  /// Opaque cursor to resume from.
  #[arg(long)]
  cursor: Option<String>,
}

/// Settings deserialised from `config.toml` / `PRISM_*` env vars.
#[derive(Deserialize)]
struct ImportSettings {
  shop:         String,
  access_token: String,
  api_version:  String,
  store_path:   PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PRISM"))
    .build()
    .context("failed to read config file")?;

  let settings: ImportSettings = settings
    .try_deserialize()
    .context("failed to deserialise import settings")?;

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", settings.store_path)
    })?;

  let client = AdminClient::new(AdminConfig {
    shop:         settings.shop,
    access_token: settings.access_token,
    api_version:  settings.api_version,
  })
  .context("failed to build admin client")?;

  let pipeline = SyncPipeline::new(client, store);
  let report = pipeline
    .run(SyncConfig {
      page_size: cli.page_size,
      max_batches: cli.max_batches,
      start_cursor: cli.cursor,
      ..SyncConfig::default()
    })
    .await
    .context("sync run failed")?;

  println!(
    "batches: {}  seen: {}  inserted: {}  errors: {}  rate limited: {}",
    report.batches,
    report.products_seen,
    report.products_inserted,
    report.errors,
    report.rate_limited,
  );
  if let Some(status) = report.fatal {
    println!("stopped early on upstream server error ({status})");
  }
  for key in report.observations.keys() {
    if let Some(values) = report.observations.values(key) {
      println!("observed {key}: {values:?}");
    }
  }

  Ok(())
}
