//! Service assembly for Uplink.
//!
//! Owns the runtime configuration, the production collaborator set
//! ([`Live`]), and the top-level router that combines the REST API under
//! `/api` with the notification fabric's `/ws` endpoint.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use uplink_engine::{
  LlmClient, LlmConfig, LlmMatchEvaluator, LlmScorer, MatchCache, MatchingConfig,
  MatchingEngine, PipelineConfig, PipelineDeps, RoutingPipeline,
};
use uplink_fabric::{Fabric, FabricConfig};
use uplink_store_sqlite::SqliteStore;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `UPLINK_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub fabric:     FabricSettings,
  pub matching:   MatchingConfig,
  pub llm:        LlmConfig,
  pub scoring:    PipelineConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".into(),
      port:       8080,
      store_path: PathBuf::from("uplink.db"),
      fabric:     FabricSettings::default(),
      matching:   MatchingConfig::default(),
      llm:        LlmConfig::default(),
      scoring:    PipelineConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Layer the TOML file at `path` (optional) under `UPLINK_*` variables.
  /// Nested keys use `__`, e.g. `UPLINK_MATCHING__AI_ENABLED=true`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("UPLINK")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct FabricSettings {
  pub heartbeat_secs:  u64,
  pub outbound_buffer: usize,
}

impl Default for FabricSettings {
  fn default() -> Self {
    let defaults = FabricConfig::default();
    Self {
      heartbeat_secs:  defaults.heartbeat_interval.as_secs(),
      outbound_buffer: defaults.outbound_buffer,
    }
  }
}

impl From<FabricSettings> for FabricConfig {
  fn from(s: FabricSettings) -> Self {
    Self {
      heartbeat_interval: Duration::from_secs(s.heartbeat_secs.max(1)),
      outbound_buffer:    s.outbound_buffer,
    }
  }
}

// ─── Wiring ───────────────────────────────────────────────────────────────────

/// Production collaborators: LLM-backed scoring and matching, SQLite
/// persistence, WebSocket delivery.
pub struct Live;

impl PipelineDeps for Live {
  type Scorer = LlmScorer;
  type Evaluator = LlmMatchEvaluator;
  type Store = SqliteStore;
  type Notifier = Arc<Fabric>;
}

/// Assemble the production pipeline around an opened store and a fabric.
pub fn live_pipeline(
  config: &ServerConfig,
  store: SqliteStore,
  fabric: Arc<Fabric>,
) -> uplink_engine::Result<RoutingPipeline<Live>> {
  let client = LlmClient::new(config.llm.clone())?;
  let cache = Arc::new(MatchCache::new(config.matching.cache_ttl()));
  let matching =
    MatchingEngine::new(LlmMatchEvaluator::new(client.clone()), config.matching.clone(), cache);
  Ok(RoutingPipeline::new(
    LlmScorer::new(client),
    matching,
    store,
    fabric,
    config.scoring,
  ))
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// `/api/…` for the REST surface, `/ws` for push connections.
pub fn router<D: PipelineDeps>(pipeline: Arc<RoutingPipeline<D>>, fabric: Arc<Fabric>) -> Router {
  Router::new()
    .nest("/api", uplink_api::api_router(pipeline))
    .merge(uplink_fabric::router(fabric))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;
  use uplink_core::{UserId, evaluator::Disabled};
  use uplink_engine::MemoryStore;

  struct Offline;

  impl PipelineDeps for Offline {
    type Scorer = Disabled;
    type Evaluator = Disabled;
    type Store = MemoryStore;
    type Notifier = Arc<Fabric>;
  }

  fn offline_app() -> (Router, Arc<Fabric>) {
    let fabric = Arc::new(Fabric::new(FabricConfig::default()));
    let pipeline: RoutingPipeline<Offline> = RoutingPipeline::new(
      Disabled,
      MatchingEngine::new(Disabled, MatchingConfig::default(), Arc::new(MatchCache::default())),
      MemoryStore::new(),
      fabric.clone(),
      PipelineConfig::default(),
    );
    (router(Arc::new(pipeline), fabric.clone()), fabric)
  }

  fn temp_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("uplink-{name}-{}.toml", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  // ── Configuration ────────────────────────────────────────────────────────

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/uplink/config.toml")).unwrap();
    assert_eq!(cfg.port, ServerConfig::default().port);
    assert_eq!(cfg.fabric.heartbeat_secs, 30);
    assert_eq!(cfg.fabric.outbound_buffer, 64);
    assert!(!cfg.matching.ai_enabled);
    assert_eq!(cfg.matching.max_concurrency, 4);
    assert_eq!(cfg.scoring.timeout_secs, 60);
  }

  #[test]
  fn file_sections_override_defaults() {
    let path = temp_config(
      "sections",
      r#"
        port = 9090
        store_path = "/var/lib/uplink/uplink.db"

        [fabric]
        heartbeat_secs = 10

        [matching]
        ai_enabled = true
        min_score = 40.0

        [llm]
        model = "local-model"
        base_url = "http://localhost:11434/v1"
      "#,
    );
    let cfg = ServerConfig::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(cfg.address(), "127.0.0.1:9090");
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/uplink/uplink.db"));
    assert_eq!(cfg.fabric.heartbeat_secs, 10);
    assert_eq!(cfg.fabric.outbound_buffer, 64);
    assert!(cfg.matching.ai_enabled);
    assert_eq!(cfg.matching.min_score, 40.0);
    assert_eq!(cfg.matching.ai_timeout_secs, 20);
    assert_eq!(cfg.llm.model, "local-model");
    assert!(cfg.llm.api_key.is_none());
  }

  #[test]
  fn fabric_settings_convert() {
    let fc: FabricConfig = FabricSettings { heartbeat_secs: 0, outbound_buffer: 8 }.into();
    assert_eq!(fc.heartbeat_interval, Duration::from_secs(1));
    assert_eq!(fc.outbound_buffer, 8);
  }

  // ── Router ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let (app, fabric) = offline_app();
    let _conn = fabric.register(Some(UserId(3)));

    let resp = app
      .clone()
      .oneshot(Request::get("/api/connections").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["connections"], 1);

    let resp = app
      .oneshot(Request::get("/connections").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn disabled_scorer_leaves_analysis_pending() {
    let (app, _fabric) = offline_app();
    let body = serde_json::json!({ "ownerId": 1, "title": "Solar kiosk" }).to_string();
    let resp = app
      .oneshot(
        Request::post("/api/ideas/1/analyze")
          .header("content-type", "application/json")
          .body(Body::from(body))
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "pending");
  }

  #[tokio::test]
  async fn ws_route_requires_an_upgrade() {
    let (app, _fabric) = offline_app();
    let resp = app
      .oneshot(Request::get("/ws?userId=1").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert!(resp.status().is_client_error());
  }
}
