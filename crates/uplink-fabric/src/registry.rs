//! The connection registry.
//!
//! All mutation goes through one mutex. Delivery serialises the event once,
//! then hands the shared payload to each matching connection's bounded
//! outbound queue with `try_send`, so a single slow client never stalls
//! delivery to the others. A full queue drops that frame for that connection
//! only; a closed queue deregisters the connection inside the same critical
//! section. A client that stays backed up stops answering pings and is left
//! to the heartbeat sweep.

use std::{
  collections::{HashMap, HashSet},
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uplink_core::{UserId, notification::{NotificationEvent, Notifier}};

use crate::connection::{Connection, ConnectionId, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FabricConfig {
  /// Interval between heartbeat sweeps.
  pub heartbeat_interval: Duration,
  /// Per-connection outbound queue depth.
  pub outbound_buffer:    usize,
}

impl Default for FabricConfig {
  fn default() -> Self {
    Self { heartbeat_interval: Duration::from_secs(30), outbound_buffer: 64 }
  }
}

#[derive(Debug)]
struct Entry {
  user:  Option<UserId>,
  alive: bool,
  tx:    mpsc::Sender<Frame>,
}

/// Result of one heartbeat sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
  /// Connections that were alive and have been sent a ping.
  pub pinged: usize,
  /// Connections that never answered the previous ping.
  pub reaped: usize,
  /// Connections whose ping could not be queued because the socket is gone.
  pub failed: usize,
  /// Backed-up connections that were not pinged this round. They stay
  /// registered but marked not-alive.
  pub skipped: usize,
}

/// Registry of live connections, keyed by connection id.
#[derive(Debug)]
pub struct Fabric {
  config:  FabricConfig,
  entries: Mutex<HashMap<ConnectionId, Entry>>,
}

impl Default for Fabric {
  fn default() -> Self { Self::new(FabricConfig::default()) }
}

impl Fabric {
  pub fn new(config: FabricConfig) -> Self {
    Self { config, entries: Mutex::new(HashMap::new()) }
  }

  pub fn config(&self) -> &FabricConfig { &self.config }

  fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Entry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  // ─── Lifecycle ─────────────────────────────────────────────────────────────

  /// Register a new connection. It starts out alive.
  pub fn register(&self, user: Option<UserId>) -> Connection {
    let id = ConnectionId::new();
    let (tx, rx) = mpsc::channel(self.config.outbound_buffer.max(1));
    self.lock().insert(id, Entry { user, alive: true, tx });
    debug!(connection = %id, user = ?user, "registered connection");
    Connection::new(id, user, rx)
  }

  /// Record a heartbeat answer. `false` if the connection is unknown.
  pub fn mark_alive(&self, id: ConnectionId) -> bool {
    match self.lock().get_mut(&id) {
      Some(entry) => {
        entry.alive = true;
        true
      }
      None => false,
    }
  }

  /// Remove a connection. Idempotent.
  pub fn deregister(&self, id: ConnectionId) -> bool {
    let removed = self.lock().remove(&id).is_some();
    if removed {
      debug!(connection = %id, "deregistered connection");
    }
    removed
  }

  /// Drop every connection. Each socket task observes its handle closing and
  /// terminates. Returns how many were open.
  pub fn shutdown(&self) -> usize {
    let mut entries = self.lock();
    let count = entries.len();
    entries.clear();
    info!(connections = count, "notification fabric shut down");
    count
  }

  // ─── Heartbeat ─────────────────────────────────────────────────────────────

  /// One heartbeat pass.
  ///
  /// A connection that has not answered since the previous sweep is removed;
  /// every other connection is marked not-alive and pinged. A connection that
  /// misses two consecutive sweeps is therefore gone, and one that answers
  /// every ping is never touched.
  pub fn sweep(&self) -> SweepReport {
    let mut entries = self.lock();
    let mut report = SweepReport::default();
    let mut dead = Vec::new();

    for (id, entry) in entries.iter_mut() {
      if !entry.alive {
        report.reaped += 1;
        dead.push(*id);
        continue;
      }
      entry.alive = false;
      match entry.tx.try_send(Frame::Ping) {
        Ok(()) => report.pinged += 1,
        Err(TrySendError::Full(_)) => report.skipped += 1,
        Err(TrySendError::Closed(_)) => {
          report.failed += 1;
          dead.push(*id);
        }
      }
    }

    for id in dead {
      entries.remove(&id);
      debug!(connection = %id, "reaped connection");
    }
    report
  }

  // ─── Delivery ──────────────────────────────────────────────────────────────

  fn deliver(
    &self,
    event: &NotificationEvent,
    matches: impl Fn(&Entry) -> bool,
  ) -> usize {
    let payload: Arc<str> = match serde_json::to_string(event) {
      Ok(s) => s.into(),
      Err(e) => {
        warn!(error = %e, "could not serialise notification");
        return 0;
      }
    };

    let mut entries = self.lock();
    let mut delivered = 0;
    let mut failed = Vec::new();

    for (id, entry) in entries.iter().filter(|(_, e)| matches(e)) {
      match entry.tx.try_send(Frame::Text(payload.clone())) {
        Ok(()) => delivered += 1,
        Err(TrySendError::Full(_)) => {
          warn!(connection = %id, "outbound queue full, dropping notification");
        }
        Err(TrySendError::Closed(_)) => {
          debug!(connection = %id, "dropping closed connection");
          failed.push(*id);
        }
      }
    }
    for id in failed {
      entries.remove(&id);
    }
    delivered
  }
}

impl Notifier for Fabric {
  fn send_to_user(&self, user: UserId, event: &NotificationEvent) -> bool {
    self.deliver(event, |e| e.user == Some(user)) > 0
  }

  fn send_to_users(&self, users: &[UserId], event: &NotificationEvent) -> usize {
    let wanted: HashSet<UserId> = users.iter().copied().collect();
    self.deliver(event, |e| e.user.is_some_and(|u| wanted.contains(&u)))
  }

  fn broadcast(&self, event: &NotificationEvent) -> usize {
    self.deliver(event, |_| true)
  }

  fn connection_count(&self) -> usize { self.lock().len() }

  fn connected_users(&self) -> Vec<UserId> {
    let mut users: Vec<UserId> =
      self.lock().values().filter_map(|e| e.user).collect();
    users.sort();
    users.dedup();
    users
  }
}
