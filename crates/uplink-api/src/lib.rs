//! JSON REST API for Uplink.
//!
//! Exposes an axum [`Router`] backed by any [`RoutingPipeline`]. Auth, TLS,
//! and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", uplink_api::api_router(pipeline.clone()))
//! ```

pub mod error;
pub mod ideas;
pub mod notifications;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use uplink_engine::{PipelineDeps, RoutingPipeline};

pub use error::ApiError;

/// Build a fully-materialised API router for `pipeline`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<D: PipelineDeps>(pipeline: Arc<RoutingPipeline<D>>) -> Router<()> {
  Router::new()
    // Ideas
    .route("/ideas/{id}/submit", post(ideas::submit::<D>))
    .route("/ideas/{id}/analyze", post(ideas::analyze::<D>))
    .route(
      "/ideas/{id}/score",
      get(ideas::latest_score::<D>).post(ideas::route_scores::<D>),
    )
    .route("/ideas/{id}/timeline", get(ideas::timeline::<D>))
    .route("/ideas/{id}/stage", get(ideas::stage::<D>))
    .route("/ideas/{id}/matches", post(ideas::matches::<D>))
    .route("/ideas/{id}/events", post(ideas::milestone::<D>))
    // Notifications
    .route("/notifications", post(notifications::send::<D>))
    .route("/connections", get(notifications::connections::<D>))
    .with_state(pipeline)
}
