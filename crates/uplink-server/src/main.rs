//! uplink-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `UPLINK_*` environment variables, opens the SQLite store, starts the
//! notification fabric and its heartbeat reaper, and serves the REST API and
//! WebSocket endpoint over HTTP until interrupted.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use uplink_fabric::{Fabric, reaper};
use uplink_server::ServerConfig;
use uplink_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Uplink routing and notification server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let fabric = Arc::new(Fabric::new(server_cfg.fabric.into()));
  let reaper = reaper::spawn(fabric.clone());

  let pipeline = uplink_server::live_pipeline(&server_cfg, store, fabric.clone())
    .context("failed to build routing pipeline")?;

  if !server_cfg.matching.ai_enabled {
    info!("AI-assisted matching disabled; using deterministic strategy");
  }

  let app = uplink_server::router(Arc::new(pipeline), fabric.clone());
  let address = server_cfg.address();

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(fabric.clone()))
    .await
    .context("server error")?;

  reaper.shutdown().await;
  info!("Shut down");
  Ok(())
}

/// Resolve on Ctrl-C, closing every push connection so upgraded sockets do
/// not hold the server open.
async fn shutdown_signal(fabric: Arc<Fabric>) {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    return;
  }
  let closed = fabric.shutdown();
  info!(connections = closed, "shutting down");
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
