//! `uplink watch`: a long-lived push subscriber.
//!
//! Connects to `/ws`, keeps the connection warm with a JSON ping, collects
//! notifications into a [`NotificationInbox`], and reconnects with
//! exponential backoff whenever the socket drops.

use std::time::Duration;

use anyhow::{Context as _, Result};
use futures::{SinkExt as _, StreamExt as _};
use tokio::{net::TcpStream, time::MissedTickBehavior};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uplink_core::{
  inbox::NotificationInbox,
  notification::{ClientMessage, ControlMessage, NotificationEvent, ServerMessage},
};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ─── Backoff ──────────────────────────────────────────────────────────────────

/// Reconnect delays: doubling from `initial`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
  initial: Duration,
  max:     Duration,
  current: Duration,
}

impl Default for Backoff {
  fn default() -> Self { Self::new(Duration::from_secs(1), Duration::from_secs(30)) }
}

impl Backoff {
  pub fn new(initial: Duration, max: Duration) -> Self {
    Self { initial, max, current: initial }
  }

  /// The delay to wait now; the following one is twice as long.
  pub fn next_delay(&mut self) -> Duration {
    let delay = self.current;
    self.current = (self.current * 2).min(self.max);
    delay
  }

  pub fn reset(&mut self) { self.current = self.initial; }
}

// ─── Watcher ──────────────────────────────────────────────────────────────────

/// Client-side state that outlives individual connections.
#[derive(Debug, Default)]
pub struct Watcher {
  inbox: NotificationInbox,
}

impl Watcher {
  pub fn with_capacity(capacity: usize) -> Self {
    Self { inbox: NotificationInbox::with_capacity(capacity) }
  }

  pub fn inbox(&self) -> &NotificationInbox { &self.inbox }

  /// Absorb one text frame. Notifications land in the inbox; the returned
  /// line, if any, is meant for the terminal.
  pub fn handle_text(&mut self, text: &str) -> Option<String> {
    match serde_json::from_str::<ServerMessage>(text) {
      Ok(ServerMessage::Notification(event)) => {
        let line = render(&event);
        self.inbox.push(event);
        Some(line)
      }
      Ok(ServerMessage::Control(ControlMessage::Connection { message, .. })) => {
        Some(format!("-- {message}"))
      }
      Ok(ServerMessage::Control(ControlMessage::Pong { .. })) => None,
      Err(e) => {
        debug!(error = %e, "ignoring unrecognised frame");
        None
      }
    }
  }
}

/// One terminal line per notification.
pub fn render(event: &NotificationEvent) -> String {
  format!(
    "[{}] {:<6} {:<14} {}: {}",
    event.timestamp.format("%H:%M:%S"),
    event.priority,
    event.kind,
    event.title,
    event.message,
  )
}

// ─── Loop ─────────────────────────────────────────────────────────────────────

enum SessionEnd {
  Closed,
  Cancelled,
}

/// Stay subscribed to `url` until `stop` is cancelled.
pub async fn run(
  url: &str,
  watcher: &mut Watcher,
  mut backoff: Backoff,
  heartbeat: Duration,
  stop: &CancellationToken,
) {
  loop {
    let connected = tokio::select! {
      _ = stop.cancelled() => return,
      res = connect_async(url) => res,
    };

    match connected {
      Ok((socket, _)) => {
        backoff.reset();
        info!(url, "connected");
        match session(socket, watcher, heartbeat, stop).await {
          Ok(SessionEnd::Cancelled) => return,
          Ok(SessionEnd::Closed) => info!("connection closed by server"),
          Err(e) => warn!(error = %e, "connection lost"),
        }
      }
      Err(e) => warn!(url, error = %e, "could not connect"),
    }

    let delay = backoff.next_delay();
    info!(delay_ms = delay.as_millis() as u64, "reconnecting");
    tokio::select! {
      _ = stop.cancelled() => return,
      _ = tokio::time::sleep(delay) => {}
    }
  }
}

async fn session(
  socket: Socket,
  watcher: &mut Watcher,
  heartbeat: Duration,
  stop: &CancellationToken,
) -> Result<SessionEnd> {
  let (mut sink, mut stream) = socket.split();
  let ping = serde_json::to_string(&ClientMessage::Ping).context("encoding ping")?;

  let mut ticker = tokio::time::interval(heartbeat);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
  // The first tick completes immediately.
  ticker.tick().await;

  loop {
    tokio::select! {
      _ = stop.cancelled() => {
        let _ = sink.send(Message::Close(None)).await;
        return Ok(SessionEnd::Cancelled);
      }
      _ = ticker.tick() => {
        sink.send(Message::Text(ping.clone().into())).await.context("sending heartbeat")?;
      }
      msg = stream.next() => match msg {
        Some(Ok(Message::Text(text))) => {
          if let Some(line) = watcher.handle_text(text.as_str()) {
            println!("{line}");
          }
        }
        Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
        Some(Ok(_)) => {}
        Some(Err(e)) => return Err(e).context("reading from socket"),
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use tokio::net::TcpListener;
  use uplink_core::{
    UserId,
    notification::{NotificationEvent, Notifier},
  };
  use uplink_fabric::{Fabric, FabricConfig};

  use super::*;

  #[test]
  fn backoff_doubles_to_the_cap_and_resets() {
    let mut b = Backoff::default();
    let delays: Vec<u64> = (0..7).map(|_| b.next_delay().as_secs()).collect();
    assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    b.reset();
    assert_eq!(b.next_delay(), Duration::from_secs(1));
  }

  #[test]
  fn notifications_fill_the_inbox() {
    let mut w = Watcher::with_capacity(2);
    for n in 0..3 {
      let event = NotificationEvent::ai_suggestion(format!("tip {n}"));
      let line = w.handle_text(&serde_json::to_string(&event).unwrap()).unwrap();
      assert!(line.contains(&format!("tip {n}")));
    }
    assert_eq!(w.inbox().len(), 2);
    assert_eq!(w.inbox().unread(), 2);
    assert_eq!(w.inbox().recent().next().unwrap().message, "tip 2");
  }

  #[test]
  fn control_frames_stay_out_of_the_inbox() {
    let mut w = Watcher::default();
    let welcome = r#"{"type":"connection","message":"Connected","timestamp":"2026-01-01T00:00:00Z"}"#;
    assert_eq!(w.handle_text(welcome).as_deref(), Some("-- Connected"));
    let pong = r#"{"type":"pong","timestamp":"2026-01-01T00:00:00Z"}"#;
    assert!(w.handle_text(pong).is_none());
    assert!(w.handle_text("not json").is_none());
    assert!(w.inbox().is_empty());
  }

  async fn wait_for_count(fabric: &Fabric, n: usize) {
    for _ in 0..500 {
      if fabric.connection_count() == n {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("connection count never reached {n}");
  }

  #[tokio::test]
  async fn receives_and_reconnects_after_server_close() {
    let fabric = Arc::new(Fabric::new(FabricConfig::default()));
    let app = uplink_fabric::router(fabric.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });

    let url = format!("ws://{addr}/ws?userId=4");
    let stop = CancellationToken::new();
    let mut watcher = Watcher::default();
    let backoff = Backoff::new(Duration::from_millis(10), Duration::from_millis(40));

    let controller = async {
      wait_for_count(&fabric, 1).await;
      assert!(fabric.send_to_user(UserId(4), &NotificationEvent::ai_suggestion("one")));
      tokio::time::sleep(Duration::from_millis(300)).await;

      fabric.shutdown();
      wait_for_count(&fabric, 1).await;
      fabric.send_to_user(UserId(4), &NotificationEvent::ai_suggestion("two"));
      tokio::time::sleep(Duration::from_millis(300)).await;
      stop.cancel();
    };

    tokio::join!(run(&url, &mut watcher, backoff, HEARTBEAT_INTERVAL, &stop), controller);

    let messages: Vec<&str> =
      watcher.inbox().recent().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["two", "one"]);
  }
}
