//! Connection identity, lifecycle state machine and the receiving handle.

use std::{fmt, sync::Arc};

use tokio::sync::mpsc;
use uplink_core::UserId;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
  pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for ConnectionId {
  fn default() -> Self { Self::new() }
}

impl fmt::Display for ConnectionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Something the fabric wants written to a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
  /// A serialised server message.
  Text(Arc<str>),
  /// A heartbeat probe; the client answers with a pong.
  Ping,
}

// ─── State machine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
  Connecting,
  Open,
  Closing,
  Closed,
}

/// Inputs that drive [`ConnectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
  Handshake,
  Pong,
  ClientClose,
  SendError,
  /// Fabric-initiated termination (reaper, shutdown).
  ForcedClose,
  /// The close handshake has been written.
  Finished,
}

impl ConnectionState {
  pub fn on(self, event: ConnectionEvent) -> Self {
    use ConnectionEvent as E;
    use ConnectionState as S;

    match (self, event) {
      (S::Closed, _) => S::Closed,
      (_, E::ForcedClose) => S::Closed,
      (S::Connecting, E::Handshake) => S::Open,
      (S::Connecting, E::ClientClose | E::SendError) => S::Closed,
      (S::Open, E::Pong) => S::Open,
      (S::Open, E::ClientClose | E::SendError) => S::Closing,
      (S::Closing, E::Finished) => S::Closed,
      (state, _) => state,
    }
  }

  pub fn is_open(self) -> bool { self == Self::Open }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// The receiving end of a registered connection.
///
/// [`Connection::recv`] yields `None` once the fabric has deregistered the
/// connection; the socket task must then terminate the socket.
#[derive(Debug)]
pub struct Connection {
  id:   ConnectionId,
  user: Option<UserId>,
  rx:   mpsc::Receiver<Frame>,
}

impl Connection {
  pub(crate) fn new(
    id: ConnectionId,
    user: Option<UserId>,
    rx: mpsc::Receiver<Frame>,
  ) -> Self {
    Self { id, user, rx }
  }

  pub fn id(&self) -> ConnectionId { self.id }

  pub fn user(&self) -> Option<UserId> { self.user }

  pub async fn recv(&mut self) -> Option<Frame> { self.rx.recv().await }

  /// Non-blocking receive. `Err(Disconnected)` once deregistered and drained.
  pub fn try_recv(&mut self) -> Result<Frame, mpsc::error::TryRecvError> {
    self.rx.try_recv()
  }
}
