//! prism API server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite replica, builds the Shopify Admin client, and serves the JSON API.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use prism_api::AppState;
use prism_store_sqlite::SqliteStore;
use prism_sync::{AdminClient, AdminConfig};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "prism catalog API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

/// Runtime server configuration, deserialised from `config.toml` /
/// `PRISM_*` env vars.
#[derive(Deserialize)]
struct ServerConfig {
  host:         String,
  port:         u16,
  store_path:   PathBuf,
  shop:         String,
  access_token: String,
  api_version:  String,
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

  let config: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store = SqliteStore::open(&config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.store_path))?;

  let client = AdminClient::new(AdminConfig {
    shop:         config.shop.clone(),
    access_token: config.access_token.clone(),
    api_version:  config.api_version.clone(),
  })
  .context("failed to build admin client")?;

  let app = prism_api::router(AppState { store, live: client })
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", config.host, config.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
