//! Periodic heartbeat task.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::Fabric;

/// Handle to a running reaper. Dropping it leaves the task running; call
/// [`Reaper::shutdown`] to stop it.
#[derive(Debug)]
pub struct Reaper {
  token:  CancellationToken,
  handle: JoinHandle<()>,
}

impl Reaper {
  pub async fn shutdown(self) {
    self.token.cancel();
    let _ = self.handle.await;
  }
}

/// Spawn the reaper at the fabric's configured heartbeat interval.
pub fn spawn(fabric: Arc<Fabric>) -> Reaper {
  let every = fabric.config().heartbeat_interval;
  spawn_every(fabric, every)
}

/// Spawn the reaper with an explicit interval.
pub fn spawn_every(fabric: Arc<Fabric>, every: Duration) -> Reaper {
  let token = CancellationToken::new();
  let cancelled = token.clone();

  let handle = tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
      tokio::select! {
        _ = cancelled.cancelled() => break,
        _ = ticker.tick() => {
          let report = fabric.sweep();
          if report.reaped + report.failed > 0 {
            info!(
              reaped = report.reaped,
              failed = report.failed,
              remaining = report.pinged,
              "heartbeat sweep removed connections"
            );
          } else {
            debug!(pinged = report.pinged, "heartbeat sweep");
          }
        }
      }
    }
    debug!("reaper stopped");
  });

  Reaper { token, handle }
}

#[cfg(test)]
mod tests {
  use tokio::sync::mpsc::error::TryRecvError;
  use uplink_core::{UserId, notification::Notifier};

  use super::*;
  use crate::{connection::Frame, registry::FabricConfig};

  fn fabric() -> Arc<Fabric> {
    Arc::new(Fabric::new(FabricConfig {
      heartbeat_interval: Duration::from_secs(30),
      ..Default::default()
    }))
  }

  #[tokio::test(start_paused = true)]
  async fn silent_connection_is_reaped_after_two_intervals() {
    let fabric = fabric();
    let mut conn = fabric.register(Some(UserId(1)));
    let reaper = spawn(fabric.clone());

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(conn.try_recv(), Ok(Frame::Ping));
    assert_eq!(fabric.connection_count(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(fabric.connection_count(), 0);
    assert_eq!(conn.recv().await, None);

    reaper.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn responsive_connection_survives() {
    let fabric = fabric();
    let mut conn = fabric.register(Some(UserId(1)));
    let reaper = spawn(fabric.clone());

    for _ in 0..5 {
      assert_eq!(conn.recv().await, Some(Frame::Ping));
      fabric.mark_alive(conn.id());
    }
    assert_eq!(fabric.connection_count(), 1);

    reaper.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn shutdown_stops_sweeping() {
    let fabric = fabric();
    let mut conn = fabric.register(None);
    spawn(fabric.clone()).shutdown().await;

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(conn.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(fabric.connection_count(), 1);
  }
}
