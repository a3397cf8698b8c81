//! The routing pipeline: scorer → classifier → journey → notifications, plus
//! matching and external milestones.
//!
//! Store errors propagate; evaluator failures degrade (analysis becomes
//! pending, matching falls back); notifications never fail the operation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uplink_core::{
  EvaluatorError, IdeaId, UserId,
  evaluator::{IdeaScorer, MatchEvaluator},
  idea::IdeaSubmission,
  journey::{JourneyEvent, JourneyKind, JourneyPayload, NewJourneyEvent},
  matching::{MatchCandidate, OpportunityFeatures},
  notification::{NotificationEvent, Notifier},
  routing::{RoutingDecision, classify},
  score::{ScoreRecord, SubScores},
  store::IdeaStore,
};

use crate::{Error, Result, matching::MatchingEngine};

/// The collaborator types a pipeline is assembled from.
pub trait PipelineDeps: Send + Sync + 'static {
  type Scorer: IdeaScorer + 'static;
  type Evaluator: MatchEvaluator + 'static;
  type Store: IdeaStore + 'static;
  type Notifier: Notifier + 'static;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Deadline for one scorer call.
  pub timeout_secs: u64,
}

impl Default for PipelineConfig {
  fn default() -> Self { Self { timeout_secs: 60 } }
}

impl PipelineConfig {
  pub fn scoring_timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// A scored and routed idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedIdea {
  pub record:   ScoreRecord,
  pub decision: RoutingDecision,
  /// The `analyzed` and `routed` events, in order.
  pub events:   Vec<JourneyEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalysisOutcome {
  Routed(RoutedIdea),
  /// The scorer could not produce a result; nothing was recorded.
  Pending { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
  pub candidates: Vec<MatchCandidate>,
  /// The `matched` event, absent when nothing was ranked.
  pub event:      Option<JourneyEvent>,
}

/// A stage transition reported by an external collaborator (escrow,
/// contracts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
  pub kind:     JourneyKind,
  #[serde(default)]
  pub owner_id: Option<UserId>,
  #[serde(default)]
  pub title:    Option<String>,
  #[serde(default)]
  pub payload:  Option<JourneyPayload>,
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

pub struct RoutingPipeline<D: PipelineDeps> {
  scorer:   D::Scorer,
  matching: MatchingEngine<D::Evaluator>,
  store:    D::Store,
  notifier: D::Notifier,
  config:   PipelineConfig,
}

impl<D: PipelineDeps> RoutingPipeline<D> {
  pub fn new(
    scorer: D::Scorer,
    matching: MatchingEngine<D::Evaluator>,
    store: D::Store,
    notifier: D::Notifier,
    config: PipelineConfig,
  ) -> Self {
    Self { scorer, matching, store, notifier, config }
  }

  pub fn store(&self) -> &D::Store { &self.store }

  pub fn notifier(&self) -> &D::Notifier { &self.notifier }

  pub fn matching(&self) -> &MatchingEngine<D::Evaluator> { &self.matching }

  async fn append(&self, event: NewJourneyEvent) -> Result<JourneyEvent> {
    self.store.append(event).await.map_err(Error::store)
  }

  /// Record that an idea entered the pipeline.
  pub async fn submit(&self, idea_id: IdeaId) -> Result<JourneyEvent> {
    let event = self.append(NewJourneyEvent::new(idea_id, JourneyKind::Submitted)).await?;
    info!(idea_id = %idea_id, "idea submitted");
    Ok(event)
  }

  /// Score with the external scorer, then classify and record.
  ///
  /// A scorer failure or timeout yields [`AnalysisOutcome::Pending`] and
  /// writes nothing.
  pub async fn analyze(&self, idea: &IdeaSubmission) -> Result<AnalysisOutcome> {
    let timeout = self.config.scoring_timeout();
    let scored = match tokio::time::timeout(timeout, self.scorer.score(idea)).await {
      Ok(result) => result,
      Err(_) => Err(EvaluatorError::Timeout(timeout)),
    };

    let sub_scores = match scored {
      Ok(s) => s,
      Err(e) => {
        warn!(idea_id = %idea.idea_id, error = %e, "idea analysis pending");
        return Ok(AnalysisOutcome::Pending { reason: e.to_string() });
      }
    };

    let record = ScoreRecord::from_untrusted(idea.idea_id, sub_scores);
    self.route(idea, record).await.map(AnalysisOutcome::Routed)
  }

  /// Route sub-scores produced elsewhere. Out-of-range values are rejected.
  pub async fn route_scores(
    &self,
    idea: &IdeaSubmission,
    sub_scores: SubScores,
  ) -> Result<RoutedIdea> {
    let record = ScoreRecord::new(idea.idea_id, sub_scores)?;
    self.route(idea, record).await
  }

  async fn route(&self, idea: &IdeaSubmission, record: ScoreRecord) -> Result<RoutedIdea> {
    self.store.record_score(&record).await.map_err(Error::store)?;

    let analyzed = self
      .append(
        NewJourneyEvent::new(idea.idea_id, JourneyKind::Analyzed).with_payload(
          JourneyPayload::Analysis {
            record_id:     record.record_id,
            overall_score: record.overall_score,
          },
        ),
      )
      .await?;

    let decision = classify(&record);
    let routed = self
      .append(
        NewJourneyEvent::new(idea.idea_id, JourneyKind::Routed).with_payload(
          JourneyPayload::Routing { decision, overall_score: record.overall_score },
        ),
      )
      .await?;

    info!(
      idea_id = %idea.idea_id,
      overall_score = record.overall_score,
      path = %decision.path,
      "idea routed"
    );

    let owner = idea.owner_id;
    let routed_note =
      NotificationEvent::idea_routed(idea.idea_id, &idea.title, decision, record.overall_score)
        .for_user(owner);
    self.notify(&routed_note);

    if record.is_high_risk() {
      let alert =
        NotificationEvent::high_risk_idea(idea.idea_id, &idea.title, record.sub_scores.risk)
          .for_user(owner);
      self.notify(&alert);
    }

    Ok(RoutedIdea { record, decision, events: vec![analyzed, routed] })
  }

  /// Rank opportunities for an idea, record the best match and tell the
  /// owner.
  pub async fn match_idea(
    &self,
    idea: &IdeaSubmission,
    opportunities: &[OpportunityFeatures],
  ) -> Result<MatchOutcome> {
    let candidates = self.matching.score(&idea.features(), opportunities).await;

    let Some(best) = candidates.first() else {
      info!(idea_id = %idea.idea_id, "no match candidates");
      return Ok(MatchOutcome { candidates, event: None });
    };

    let event = self
      .append(
        NewJourneyEvent::new(idea.idea_id, JourneyKind::Matched).with_payload(
          JourneyPayload::Match {
            opportunity_id:   best.opportunity_id,
            opportunity_kind: best.opportunity_kind,
            match_score:      best.match_score,
            candidates:       candidates.len(),
          },
        ),
      )
      .await?;

    info!(
      idea_id = %idea.idea_id,
      opportunity_id = %best.opportunity_id,
      match_score = best.match_score,
      candidates = candidates.len(),
      "idea matched"
    );

    let note = NotificationEvent::match_found(&idea.title, best, candidates.len())
      .for_user(idea.owner_id);
    self.notify(&note);

    Ok(MatchOutcome { candidates, event: Some(event) })
  }

  /// Append an externally reported stage and tell the owner, if known.
  pub async fn record_milestone(
    &self,
    idea_id: IdeaId,
    milestone: Milestone,
  ) -> Result<JourneyEvent> {
    let mut new = NewJourneyEvent::new(idea_id, milestone.kind.clone());
    if let Some(payload) = milestone.payload {
      new = new.with_payload(payload);
    }
    let event = self.append(new).await?;
    info!(idea_id = %idea_id, kind = %event.kind, "milestone recorded");

    if let Some(owner) = milestone.owner_id {
      let title = milestone.title.unwrap_or_else(|| format!("Idea #{idea_id}"));
      let note = NotificationEvent::milestone(idea_id, &title, milestone.kind).for_user(owner);
      self.notify(&note);
    }
    Ok(event)
  }

  fn notify(&self, event: &NotificationEvent) {
    let delivered = self.notifier.dispatch(event);
    if delivered == 0 {
      debug!(kind = %event.kind, target = ?event.target, "notification not delivered");
    }
  }
}
