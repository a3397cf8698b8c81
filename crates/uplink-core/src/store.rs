//! The `IdeaStore` trait: score records and the journey timeline.
//!
//! Implemented by the in-memory tracker (`uplink-engine`) and the SQLite
//! backend (`uplink-store-sqlite`). Higher layers depend on this abstraction
//! only.

use std::future::Future;

use crate::{
  ids::IdeaId,
  journey::{JourneyEvent, NewJourneyEvent, Stage},
  score::ScoreRecord,
};

/// Persistence for the two record types the pipeline produces.
///
/// Everything is append-only: score records are never replaced in place and
/// journey events are never reordered, edited or removed.
///
/// Appends for the same idea are serialised so that `seq` is gap-free and
/// `recorded_at` is non-decreasing; appends for different ideas must not wait
/// on each other beyond what the backend inherently serialises.
pub trait IdeaStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Score records ─────────────────────────────────────────────────────

  /// Persist a new score record.
  fn record_score<'a>(
    &'a self,
    record: &'a ScoreRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The most recent score record for an idea, if any.
  fn latest_score(
    &self,
    idea_id: IdeaId,
  ) -> impl Future<Output = Result<Option<ScoreRecord>, Self::Error>> + Send + '_;

  // ── Journey ───────────────────────────────────────────────────────────

  /// Append an event. The store assigns `seq` and `recorded_at`.
  fn append(
    &self,
    event: NewJourneyEvent,
  ) -> impl Future<Output = Result<JourneyEvent, Self::Error>> + Send + '_;

  /// All events for an idea, ascending by `seq`.
  fn timeline(
    &self,
    idea_id: IdeaId,
  ) -> impl Future<Output = Result<Vec<JourneyEvent>, Self::Error>> + Send + '_;

  /// Kind of the last appended event, or [`Stage::NotStarted`].
  fn current_stage(
    &self,
    idea_id: IdeaId,
  ) -> impl Future<Output = Result<Stage, Self::Error>> + Send + '_;
}
