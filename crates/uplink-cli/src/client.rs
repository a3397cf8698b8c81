//! Async HTTP client wrapping the Uplink JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uplink_core::{
  IdeaId, UserId,
  journey::{JourneyEvent, Stage},
  notification::{NotificationKind, Priority},
};

/// Connection settings for the Uplink API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Async HTTP client for the Uplink JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageResponse {
  stage: Stage,
}

/// Body of `POST /api/notifications`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outgoing {
  #[serde(rename = "type")]
  pub kind:     NotificationKind,
  pub title:    String,
  pub message:  String,
  pub priority: Priority,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub user_ids: Vec<UserId>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
  delivered: usize,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// The push endpoint for `user`, on the same host as the API.
  pub fn ws_url(&self, user: Option<UserId>) -> String {
    let base = self.config.base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
      format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
      format!("ws://{rest}")
    } else {
      base.to_string()
    };
    match user {
      Some(user) => format!("{base}/ws?userId={user}"),
      None => format!("{base}/ws"),
    }
  }

  // ── Journey ───────────────────────────────────────────────────────────────

  /// `GET /api/ideas/{id}/timeline`
  pub async fn timeline(&self, idea: IdeaId) -> Result<Vec<JourneyEvent>> {
    let resp = self
      .client
      .get(self.url(&format!("/ideas/{idea}/timeline")))
      .send()
      .await
      .context("GET /timeline failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /timeline → {}", resp.status()));
    }
    resp.json().await.context("deserialising timeline")
  }

  /// `GET /api/ideas/{id}/stage`
  pub async fn stage(&self, idea: IdeaId) -> Result<Stage> {
    let resp = self
      .client
      .get(self.url(&format!("/ideas/{idea}/stage")))
      .send()
      .await
      .context("GET /stage failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /stage → {}", resp.status()));
    }
    let body: StageResponse = resp.json().await.context("deserialising stage")?;
    Ok(body.stage)
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  /// `POST /api/notifications`. Returns the number of connections reached.
  pub async fn send(&self, notification: &Outgoing) -> Result<usize> {
    let resp = self
      .client
      .post(self.url("/notifications"))
      .json(notification)
      .send()
      .await
      .context("POST /notifications failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST /notifications → {}", resp.status()));
    }
    let body: SendResponse = resp.json().await.context("deserialising send response")?;
    Ok(body.delivered)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(base: &str) -> ApiClient {
    ApiClient::new(ApiConfig { base_url: base.into() }).unwrap()
  }

  #[test]
  fn urls() {
    let c = client("http://localhost:8080/");
    assert_eq!(c.url("/ideas/3/stage"), "http://localhost:8080/api/ideas/3/stage");
    assert_eq!(c.ws_url(Some(UserId(7))), "ws://localhost:8080/ws?userId=7");
    assert_eq!(c.ws_url(None), "ws://localhost:8080/ws");
    assert_eq!(client("https://uplink.example").ws_url(None), "wss://uplink.example/ws");
  }

  #[test]
  fn outgoing_shape() {
    let body = Outgoing {
      kind:     NotificationKind::General,
      title:    "Maintenance".into(),
      message:  "Tonight".into(),
      priority: Priority::High,
      user_ids: Vec::new(),
    };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(
      json,
      serde_json::json!({
        "type": "general",
        "title": "Maintenance",
        "message": "Tonight",
        "priority": "high"
      })
    );
  }
}
