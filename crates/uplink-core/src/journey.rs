//! Journey timeline: the append-only audit trail of an idea's stages.
//!
//! Events are immutable and strictly ordered per idea by `seq`; timestamps
//! never decrease along a timeline. The current stage is the kind of the
//! latest event.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  ids::{IdeaId, OpportunityId},
  matching::OpportunityKind,
  routing::RoutingDecision,
};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// What happened. Open-ended: collaborators may record kinds this crate does
/// not know about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JourneyKind {
  Submitted,
  Analyzed,
  Routed,
  Matched,
  Funded,
  Contracted,
  Completed,
  Other(String),
}

impl JourneyKind {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Submitted => "submitted",
      Self::Analyzed => "analyzed",
      Self::Routed => "routed",
      Self::Matched => "matched",
      Self::Funded => "funded",
      Self::Contracted => "contracted",
      Self::Completed => "completed",
      Self::Other(s) => s,
    }
  }

  pub fn parse(s: &str) -> Self {
    match s {
      "submitted" => Self::Submitted,
      "analyzed" => Self::Analyzed,
      "routed" => Self::Routed,
      "matched" => Self::Matched,
      "funded" => Self::Funded,
      "contracted" => Self::Contracted,
      "completed" => Self::Completed,
      other => Self::Other(other.to_owned()),
    }
  }
}

impl fmt::Display for JourneyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl From<String> for JourneyKind {
  fn from(s: String) -> Self { Self::parse(&s) }
}

impl From<JourneyKind> for String {
  fn from(k: JourneyKind) -> Self { k.as_str().to_owned() }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// Structured detail attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum JourneyPayload {
  Analysis {
    record_id:     Uuid,
    overall_score: f64,
  },
  Routing {
    decision:      RoutingDecision,
    overall_score: f64,
  },
  Match {
    opportunity_id:   OpportunityId,
    opportunity_kind: OpportunityKind,
    match_score:      f64,
    /// How many candidates were ranked alongside the chosen one.
    candidates:       usize,
  },
  Contract {
    reference: String,
  },
  Note {
    text: String,
  },
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// One timeline entry. `seq` starts at 1 for each idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyEvent {
  pub idea_id:     IdeaId,
  pub seq:         u64,
  pub kind:        JourneyKind,
  /// Store-assigned; never earlier than the previous event's.
  pub recorded_at: DateTime<Utc>,
  pub payload:     Option<JourneyPayload>,
}

/// Input to [`crate::store::IdeaStore::append`]. Ordinal and timestamp are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewJourneyEvent {
  pub idea_id: IdeaId,
  pub kind:    JourneyKind,
  pub payload: Option<JourneyPayload>,
}

impl NewJourneyEvent {
  pub fn new(idea_id: IdeaId, kind: JourneyKind) -> Self {
    Self { idea_id, kind, payload: None }
  }

  pub fn with_payload(mut self, payload: JourneyPayload) -> Self {
    self.payload = Some(payload);
    self
  }
}

/// The timestamp to assign to the next event: `now`, unless the clock went
/// backwards since the previous event.
pub fn next_timestamp(
  previous: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> DateTime<Utc> {
  match previous {
    Some(prev) if prev > now => prev,
    _ => now,
  }
}

// ─── Stage ───────────────────────────────────────────────────────────────────

/// The current stage of an idea; `NotStarted` when it has no events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
  NotStarted,
  At(JourneyKind),
}

impl Stage {
  pub const NONE: &'static str = "none";

  pub fn from_timeline(events: &[JourneyEvent]) -> Self {
    events
      .last()
      .map(|e| Self::At(e.kind.clone()))
      .unwrap_or(Self::NotStarted)
  }

  pub fn kind(&self) -> Option<&JourneyKind> {
    match self {
      Self::NotStarted => None,
      Self::At(kind) => Some(kind),
    }
  }
}

impl From<String> for Stage {
  fn from(s: String) -> Self {
    if s == Self::NONE {
      Self::NotStarted
    } else {
      Self::At(JourneyKind::parse(&s))
    }
  }
}

impl From<Stage> for String {
  fn from(s: Stage) -> Self {
    match s {
      Stage::NotStarted => Stage::NONE.to_owned(),
      Stage::At(kind) => kind.into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::routing::Path;

  #[test]
  fn kind_round_trips_known_and_custom() {
    assert_eq!(JourneyKind::parse("routed"), JourneyKind::Routed);
    assert_eq!(
      JourneyKind::parse("pitched"),
      JourneyKind::Other("pitched".into())
    );
    let json = serde_json::to_string(&JourneyKind::Funded).unwrap();
    assert_eq!(json, "\"funded\"");
  }

  #[test]
  fn stage_of_empty_timeline_is_none() {
    assert_eq!(Stage::from_timeline(&[]), Stage::NotStarted);
    assert_eq!(serde_json::to_string(&Stage::NotStarted).unwrap(), "\"none\"");
  }

  #[test]
  fn stage_is_last_kind() {
    let at = Utc::now();
    let events = vec![
      JourneyEvent {
        idea_id:     IdeaId(1),
        seq:         1,
        kind:        JourneyKind::Submitted,
        recorded_at: at,
        payload:     None,
      },
      JourneyEvent {
        idea_id:     IdeaId(1),
        seq:         2,
        kind:        JourneyKind::Routed,
        recorded_at: at,
        payload:     Some(JourneyPayload::Routing {
          decision:      RoutingDecision::for_path(Path::Innovation),
          overall_score: 72.0,
        }),
      },
    ];
    assert_eq!(Stage::from_timeline(&events), Stage::At(JourneyKind::Routed));
  }

  #[test]
  fn next_timestamp_never_goes_backwards() {
    let now = Utc::now();
    let later = now + Duration::seconds(5);
    assert_eq!(next_timestamp(None, now), now);
    assert_eq!(next_timestamp(Some(now), later), later);
    assert_eq!(next_timestamp(Some(later), now), later);
  }

  #[test]
  fn payload_is_tagged() {
    let p = JourneyPayload::Match {
      opportunity_id:   OpportunityId(4),
      opportunity_kind: OpportunityKind::Investor,
      match_score:      81.0,
      candidates:       5,
    };
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json["type"], "match");
    assert_eq!(json["opportunityId"], 4);
    assert_eq!(json["opportunityKind"], "investor");
  }
}
