//! Core types, pure algorithms and collaborator traits for the Uplink
//! routing and matching pipeline.
//!
//! This crate has no HTTP, database or async-runtime dependencies. The
//! engine, fabric, store and API crates all build on it.

// Native `async fn` / `impl Future` in traits; callers in this workspace
// always require `Send` futures explicitly.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod evaluator;
pub mod ids;
pub mod idea;
pub mod inbox;
pub mod journey;
pub mod matching;
pub mod notification;
pub mod routing;
pub mod score;
pub mod store;

pub use error::{Error, EvaluatorError, Result};
pub use ids::{IdeaId, OpportunityId, UserId};
