//! `uplink`: terminal client for the Uplink routing and notification
//! service.
//!
//! # Usage
//!
//! ```
//! uplink --url http://localhost:8080 watch --user 7
//! uplink timeline 42
//! uplink broadcast "Maintenance" "Back at 22:00" --priority high
//! uplink --config ~/.config/uplink/config.toml stage 42
//! ```

mod client;
mod watch;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, Outgoing};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uplink_core::{
  IdeaId, UserId,
  inbox::DEFAULT_INBOX_CAPACITY,
  journey::JourneyPayload,
  notification::{NotificationKind, Priority},
};
use watch::{Backoff, HEARTBEAT_INTERVAL, Watcher};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "uplink", about = "Terminal client for the Uplink service")]
struct Args {
  /// Path to a TOML config file (url, user).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the uplink server (default: http://localhost:8080).
  #[arg(long, env = "UPLINK_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Stream live notifications until interrupted.
  Watch {
    /// Receive notifications addressed to this user as well as broadcasts.
    #[arg(long)]
    user: Option<i64>,

    /// How many notifications to keep in the inbox.
    #[arg(long, default_value_t = DEFAULT_INBOX_CAPACITY)]
    keep: usize,
  },

  /// Print an idea's journey, oldest first.
  Timeline { idea: i64 },

  /// Print an idea's current stage.
  Stage { idea: i64 },

  /// Send a notification to the given users, or to everyone.
  Broadcast {
    title:   String,
    message: String,

    #[arg(long, default_value = "general")]
    kind: NotificationKind,

    #[arg(long, default_value = "medium")]
    priority: Priority,

    /// Recipient user id; repeat for several.
    #[arg(long = "user")]
    users: Vec<i64>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:  String,
  /// Default user for `watch`.
  #[serde(default)]
  user: Option<i64>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
  };
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::Watch { user, keep } => {
      let user = user.or(file_cfg.user).map(UserId);
      watch_until_interrupted(&client, user, keep).await
    }
    Command::Timeline { idea } => print_timeline(&client, IdeaId(idea)).await,
    Command::Stage { idea } => {
      let stage = client.stage(IdeaId(idea)).await?;
      println!("{}", String::from(stage));
      Ok(())
    }
    Command::Broadcast { title, message, kind, priority, users } => {
      let outgoing = Outgoing {
        kind,
        title,
        message,
        priority,
        user_ids: users.into_iter().map(UserId).collect(),
      };
      let delivered = client.send(&outgoing).await?;
      println!("delivered to {delivered} connection(s)");
      Ok(())
    }
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn watch_until_interrupted(
  client: &ApiClient,
  user: Option<UserId>,
  keep: usize,
) -> Result<()> {
  let url = client.ws_url(user);
  let stop = CancellationToken::new();
  let on_signal = stop.clone();
  tokio::spawn(async move {
    let _ = tokio::signal::ctrl_c().await;
    on_signal.cancel();
  });

  let mut watcher = Watcher::with_capacity(keep);
  watch::run(&url, &mut watcher, Backoff::default(), HEARTBEAT_INTERVAL, &stop).await;

  let inbox = watcher.inbox();
  eprintln!("{} notification(s) kept, {} unread", inbox.len(), inbox.unread());
  Ok(())
}

async fn print_timeline(client: &ApiClient, idea: IdeaId) -> Result<()> {
  let events = client.timeline(idea).await?;
  if events.is_empty() {
    println!("idea {idea} has no journey events");
    return Ok(());
  }
  for event in events {
    let detail = match &event.payload {
      Some(JourneyPayload::Analysis { overall_score, .. }) => {
        format!("score {overall_score:.1}")
      }
      Some(JourneyPayload::Routing { decision, .. }) => format!("→ {}", decision.path),
      Some(JourneyPayload::Match { opportunity_id, match_score, .. }) => {
        format!("opportunity {opportunity_id} ({match_score:.0})")
      }
      Some(JourneyPayload::Contract { reference }) => format!("contract {reference}"),
      Some(JourneyPayload::Note { text }) => text.clone(),
      None => String::new(),
    };
    println!(
      "{:>3}  {}  {:<12} {detail}",
      event.seq,
      event.recorded_at.format("%Y-%m-%d %H:%M:%S"),
      event.kind,
    );
  }
  Ok(())
}
