//! Handlers for `/notifications` and `/connections`.
//!
//! `POST /notifications` routes by recipients: `userIds` (multicast), else
//! `userId` (unicast), else broadcast. `delivered` counts connections for
//! multicast and broadcast; a unicast reports `1` when the user had any open
//! connection.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uplink_core::{
  UserId,
  notification::{NotificationData, NotificationEvent, NotificationKind, Notifier, Priority},
};
use uplink_engine::{PipelineDeps, RoutingPipeline};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
  #[serde(rename = "type")]
  pub kind:     NotificationKind,
  pub title:    String,
  pub message:  String,
  #[serde(default)]
  pub data:     Option<NotificationData>,
  #[serde(default)]
  pub priority: Priority,
  #[serde(default)]
  pub user_id:  Option<UserId>,
  #[serde(default)]
  pub user_ids: Vec<UserId>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendResponse {
  pub delivered: usize,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionsResponse {
  pub connections: usize,
  pub users:       Vec<UserId>,
}

/// `POST /notifications`
pub async fn send<D: PipelineDeps>(
  State(pipeline): State<Arc<RoutingPipeline<D>>>,
  Json(body): Json<SendBody>,
) -> Result<Json<SendResponse>, ApiError> {
  if body.title.trim().is_empty() {
    return Err(ApiError::BadRequest("title must not be empty".into()));
  }

  let mut event =
    NotificationEvent::new(body.kind, body.title, body.message, body.priority);
  if let Some(data) = body.data {
    event = event.with_data(data);
  }

  let notifier = pipeline.notifier();
  let delivered = if !body.user_ids.is_empty() {
    notifier.send_to_users(&body.user_ids, &event)
  } else if let Some(user) = body.user_id {
    usize::from(notifier.send_to_user(user, &event.for_user(user)))
  } else {
    notifier.broadcast(&event)
  };

  debug!(delivered, "notification sent");
  Ok(Json(SendResponse { delivered }))
}

/// `GET /connections`
pub async fn connections<D: PipelineDeps>(
  State(pipeline): State<Arc<RoutingPipeline<D>>>,
) -> Json<ConnectionsResponse> {
  let notifier = pipeline.notifier();
  Json(ConnectionsResponse {
    connections: notifier.connection_count(),
    users:       notifier.connected_users(),
  })
}
