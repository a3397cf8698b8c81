//! WebSocket endpoint: one task per connection bridging the socket and the
//! fabric.

use std::sync::Arc;

use axum::{
  extract::{
    Query, State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  response::Response,
};
use bytes::Bytes;
use chrono::Utc;
use futures::{SinkExt, StreamExt, stream::SplitSink};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uplink_core::{
  UserId,
  notification::{ClientMessage, ControlMessage},
};

use crate::{
  connection::{ConnectionEvent, ConnectionState, Frame},
  registry::Fabric,
};

/// Query string of `GET /ws`. A missing or non-numeric `userId` yields an
/// anonymous connection that only receives broadcasts.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
  pub user_id: Option<String>,
}

impl ConnectParams {
  pub fn user(&self) -> Option<UserId> {
    self.user_id.as_deref().and_then(|s| s.trim().parse::<i64>().ok()).map(UserId)
  }
}

pub async fn upgrade(
  State(fabric): State<Arc<Fabric>>,
  Query(params): Query<ConnectParams>,
  ws: WebSocketUpgrade,
) -> Response {
  let user = params.user();
  ws.on_upgrade(move |socket| session(fabric, socket, user))
}

type Sink = SplitSink<WebSocket, Message>;

async fn send_json<T: Serialize>(sink: &mut Sink, value: &T) -> bool {
  match serde_json::to_string(value) {
    Ok(text) => sink.send(Message::Text(text.into())).await.is_ok(),
    Err(_) => false,
  }
}

async fn session(fabric: Arc<Fabric>, socket: WebSocket, user: Option<UserId>) {
  let mut conn = fabric.register(user);
  let id = conn.id();
  let mut state = ConnectionState::Connecting.on(ConnectionEvent::Handshake);
  info!(connection = %id, user = ?user, "client connected");

  let (mut sink, mut stream) = socket.split();

  let welcome = ControlMessage::Connection {
    message:   "Connected to notification service".into(),
    timestamp: Utc::now(),
  };
  if !send_json(&mut sink, &welcome).await {
    state = state.on(ConnectionEvent::SendError);
  }

  while state.is_open() {
    tokio::select! {
      frame = conn.recv() => {
        let sent = match frame {
          Some(Frame::Text(text)) => sink.send(Message::Text(text.as_ref().into())).await.is_ok(),
          Some(Frame::Ping) => sink.send(Message::Ping(Bytes::new())).await.is_ok(),
          None => {
            // Deregistered by the fabric: reaped or shutting down.
            state = state.on(ConnectionEvent::ForcedClose);
            continue;
          }
        };
        if !sent {
          state = state.on(ConnectionEvent::SendError);
        }
      }
      incoming = stream.next() => match incoming {
        Some(Ok(Message::Pong(_))) => {
          fabric.mark_alive(id);
          state = state.on(ConnectionEvent::Pong);
        }
        Some(Ok(Message::Text(text))) => {
          match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(ClientMessage::Ping) => {
              fabric.mark_alive(id);
              state = state.on(ConnectionEvent::Pong);
              let pong = ControlMessage::Pong { timestamp: Utc::now() };
              if !send_json(&mut sink, &pong).await {
                state = state.on(ConnectionEvent::SendError);
              }
            }
            Err(e) => debug!(connection = %id, error = %e, "ignoring client message"),
          }
        }
        Some(Ok(Message::Close(_))) | None => state = state.on(ConnectionEvent::ClientClose),
        Some(Err(e)) => {
          debug!(connection = %id, error = %e, "socket error");
          state = state.on(ConnectionEvent::ClientClose);
        }
        Some(Ok(_)) => {}
      }
    }
  }

  fabric.deregister(id);
  if state == ConnectionState::Closing {
    let _ = sink.send(Message::Close(None)).await;
    state = state.on(ConnectionEvent::Finished);
  }
  info!(connection = %id, user = ?user, state = ?state, "client disconnected");
}
