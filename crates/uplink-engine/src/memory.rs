//! In-memory `IdeaStore`.
//!
//! Each idea's timeline sits behind its own async mutex, so appends for one
//! idea are serialised while appends for different ideas proceed in
//! parallel. The outer map lock is only held long enough to look up or
//! insert that mutex.

use std::{
  collections::HashMap,
  convert::Infallible,
  sync::{Arc, PoisonError, RwLock},
};

use chrono::Utc;
use tokio::sync::Mutex;
use uplink_core::{
  IdeaId,
  journey::{JourneyEvent, NewJourneyEvent, Stage, next_timestamp},
  score::ScoreRecord,
  store::IdeaStore,
};

type Timeline = Arc<Mutex<Vec<JourneyEvent>>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
  timelines: RwLock<HashMap<IdeaId, Timeline>>,
  scores:    RwLock<HashMap<IdeaId, Vec<ScoreRecord>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn existing(&self, idea_id: IdeaId) -> Option<Timeline> {
    self
      .timelines
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&idea_id)
      .cloned()
  }

  fn timeline_for(&self, idea_id: IdeaId) -> Timeline {
    if let Some(t) = self.existing(idea_id) {
      return t;
    }
    self
      .timelines
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(idea_id)
      .or_default()
      .clone()
  }
}

impl IdeaStore for MemoryStore {
  type Error = Infallible;

  async fn record_score(&self, record: &ScoreRecord) -> Result<(), Infallible> {
    self
      .scores
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(record.idea_id)
      .or_default()
      .push(record.clone());
    Ok(())
  }

  async fn latest_score(&self, idea_id: IdeaId) -> Result<Option<ScoreRecord>, Infallible> {
    Ok(
      self
        .scores
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&idea_id)
        .and_then(|records| records.last().cloned()),
    )
  }

  async fn append(&self, event: NewJourneyEvent) -> Result<JourneyEvent, Infallible> {
    let timeline = self.timeline_for(event.idea_id);
    let mut events = timeline.lock().await;

    let recorded_at = next_timestamp(events.last().map(|e| e.recorded_at), Utc::now());
    let stored = JourneyEvent {
      idea_id: event.idea_id,
      seq: events.len() as u64 + 1,
      kind: event.kind,
      recorded_at,
      payload: event.payload,
    };
    events.push(stored.clone());
    Ok(stored)
  }

  async fn timeline(&self, idea_id: IdeaId) -> Result<Vec<JourneyEvent>, Infallible> {
    match self.existing(idea_id) {
      Some(t) => Ok(t.lock().await.clone()),
      None => Ok(Vec::new()),
    }
  }

  async fn current_stage(&self, idea_id: IdeaId) -> Result<Stage, Infallible> {
    match self.existing(idea_id) {
      Some(t) => Ok(Stage::from_timeline(&t.lock().await)),
      None => Ok(Stage::NotStarted),
    }
  }
}
