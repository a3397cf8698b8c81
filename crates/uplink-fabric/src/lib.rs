//! Notification fabric: the in-memory registry of live push connections.
//!
//! A [`Fabric`] is constructed at service start, shared behind an `Arc`, and
//! torn down with [`Fabric::shutdown`]. It owns every connection entry; the
//! per-connection WebSocket tasks in [`ws`] and the [`reaper`] only talk to
//! it through its methods.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let fabric = Arc::new(Fabric::new(FabricConfig::default()));
//! let reaper = uplink_fabric::reaper::spawn(fabric.clone());
//! let app = Router::new().merge(uplink_fabric::router(fabric.clone()));
//! ```

pub mod connection;
pub mod reaper;
pub mod registry;
pub mod ws;

use std::sync::Arc;

use axum::{Router, routing::get};

pub use connection::{Connection, ConnectionId, ConnectionState, Frame};
pub use registry::{Fabric, FabricConfig, SweepReport};

/// Router exposing `GET /ws?userId=<id>`.
pub fn router(fabric: Arc<Fabric>) -> Router<()> {
  Router::new().route("/ws", get(ws::upgrade)).with_state(fabric)
}
