//! Notification events, the push wire protocol, and the [`Notifier`] seam.
//!
//! Notifications are best-effort: they are delivered to whichever
//! connections are open at send time and are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  ids::{IdeaId, OpportunityId, UserId},
  journey::JourneyKind,
  matching::{MatchCandidate, MatchTier, OpportunityKind},
  routing::{PartnerCategory, Path, RoutingDecision},
};

// ─── Kind and priority ───────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum NotificationKind {
  RiskAlert,
  Suggestion,
  ProjectUpdate,
  MatchAlert,
  GateDecision,
  General,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High,
  Urgent,
}

// ─── Data ────────────────────────────────────────────────────────────────────

/// Structured detail carried by a notification, one variant per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NotificationData {
  IdeaRisk {
    idea_id:    IdeaId,
    idea_title: String,
    risk_score: f64,
  },
  HypothesisRisk {
    hypothesis_title: String,
    rat_score:        f64,
  },
  ProjectStatus {
    project_title: String,
    new_status:    String,
  },
  Routing {
    idea_id:          IdeaId,
    path:             Path,
    partner_category: PartnerCategory,
    overall_score:    f64,
  },
  Match {
    idea_id:          IdeaId,
    opportunity_id:   OpportunityId,
    opportunity_kind: OpportunityKind,
    match_score:      f64,
    tier:             MatchTier,
    candidates:       usize,
  },
  Milestone {
    idea_id: IdeaId,
    stage:   JourneyKind,
  },
  GateDecision {
    project_title: String,
    decision:      String,
  },
  Custom {
    value: serde_json::Value,
  },
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A transient message pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
  #[serde(rename = "type")]
  pub kind:      NotificationKind,
  pub title:     String,
  pub message:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data:      Option<NotificationData>,
  pub priority:  Priority,
  pub timestamp: DateTime<Utc>,
  /// Absent means broadcast.
  #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
  pub target:    Option<UserId>,
}

impl NotificationEvent {
  pub fn new(
    kind: NotificationKind,
    title: impl Into<String>,
    message: impl Into<String>,
    priority: Priority,
  ) -> Self {
    Self {
      kind,
      title: title.into(),
      message: message.into(),
      data: None,
      priority,
      timestamp: Utc::now(),
      target: None,
    }
  }

  pub fn with_data(mut self, data: NotificationData) -> Self {
    self.data = Some(data);
    self
  }

  pub fn for_user(mut self, user: UserId) -> Self {
    self.target = Some(user);
    self
  }

  // ── Typed constructors ───────────────────────────────────────────────

  pub fn high_risk_idea(idea_id: IdeaId, idea_title: &str, risk_score: f64) -> Self {
    Self::new(
      NotificationKind::RiskAlert,
      "High-risk idea",
      format!(
        "The idea \"{idea_title}\" has a high risk score ({risk_score:.2}). \
         Further validation is recommended."
      ),
      Priority::Urgent,
    )
    .with_data(NotificationData::IdeaRisk {
      idea_id,
      idea_title: idea_title.to_owned(),
      risk_score,
    })
  }

  pub fn hypothesis_risk(hypothesis_title: &str, rat_score: f64) -> Self {
    Self::new(
      NotificationKind::RiskAlert,
      "Risky assumption",
      format!(
        "The hypothesis \"{hypothesis_title}\" has a high RAT score \
         ({rat_score:.2}) and needs testing now."
      ),
      Priority::High,
    )
    .with_data(NotificationData::HypothesisRisk {
      hypothesis_title: hypothesis_title.to_owned(),
      rat_score,
    })
  }

  pub fn ai_suggestion(suggestion: impl Into<String>) -> Self {
    Self::new(
      NotificationKind::Suggestion,
      "New AI suggestion",
      suggestion,
      Priority::Medium,
    )
  }

  pub fn project_update(project_title: &str, new_status: &str) -> Self {
    Self::new(
      NotificationKind::ProjectUpdate,
      "Project status updated",
      format!("\"{project_title}\" is now: {new_status}"),
      Priority::Medium,
    )
    .with_data(NotificationData::ProjectStatus {
      project_title: project_title.to_owned(),
      new_status:    new_status.to_owned(),
    })
  }

  pub fn gate_decision(project_title: &str, decision: &str) -> Self {
    Self::new(
      NotificationKind::GateDecision,
      "Gate decision",
      format!("Decision \"{decision}\" was taken for \"{project_title}\""),
      Priority::High,
    )
    .with_data(NotificationData::GateDecision {
      project_title: project_title.to_owned(),
      decision:      decision.to_owned(),
    })
  }

  pub fn idea_routed(
    idea_id: IdeaId,
    idea_title: &str,
    decision: RoutingDecision,
    overall_score: f64,
  ) -> Self {
    Self::new(
      NotificationKind::ProjectUpdate,
      "Idea analysed",
      format!(
        "\"{idea_title}\" scored {overall_score:.1} and was routed to the {} \
         path; suggested partner: {}",
        decision.path,
        decision.suggested_partner_category.label(),
      ),
      Priority::Medium,
    )
    .with_data(NotificationData::Routing {
      idea_id,
      path: decision.path,
      partner_category: decision.suggested_partner_category,
      overall_score,
    })
  }

  /// Announce the best of `candidates` ranked candidates.
  pub fn match_found(idea_title: &str, best: &MatchCandidate, candidates: usize) -> Self {
    let tier = best.tier();
    let priority = if tier == MatchTier::Excellent {
      Priority::High
    } else {
      Priority::Medium
    };
    Self::new(
      NotificationKind::MatchAlert,
      "New match",
      format!(
        "\"{idea_title}\" has a {tier} match with {} #{} ({:.0}/100)",
        best.opportunity_kind, best.opportunity_id, best.match_score,
      ),
      priority,
    )
    .with_data(NotificationData::Match {
      idea_id: best.idea_id,
      opportunity_id: best.opportunity_id,
      opportunity_kind: best.opportunity_kind,
      match_score: best.match_score,
      tier,
      candidates,
    })
  }

  pub fn milestone(idea_id: IdeaId, idea_title: &str, stage: JourneyKind) -> Self {
    Self::new(
      NotificationKind::ProjectUpdate,
      "Idea progressed",
      format!("\"{idea_title}\" reached stage: {stage}"),
      Priority::Medium,
    )
    .with_data(NotificationData::Milestone { idea_id, stage })
  }
}

// ─── Wire protocol ───────────────────────────────────────────────────────────

/// Control messages the server sends outside of notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
  Connection {
    message:   String,
    timestamp: DateTime<Utc>,
  },
  Pong {
    timestamp: DateTime<Utc>,
  },
}

/// Anything the server pushes down a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
  Control(ControlMessage),
  Notification(NotificationEvent),
}

/// The only message a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
  Ping,
}

// ─── Notifier ────────────────────────────────────────────────────────────────

/// Delivery seam between the business pipeline and the push fabric.
///
/// Methods never fail: undeliverable events are dropped.
pub trait Notifier: Send + Sync {
  /// Deliver to every open connection of `user`. `true` if at least one
  /// delivery succeeded.
  fn send_to_user(&self, user: UserId, event: &NotificationEvent) -> bool;

  /// Deliver to the union of connections of `users`; returns the count.
  fn send_to_users(&self, users: &[UserId], event: &NotificationEvent) -> usize;

  /// Deliver to every open connection; returns the count.
  fn broadcast(&self, event: &NotificationEvent) -> usize;

  fn connection_count(&self) -> usize;

  /// Distinct users with at least one open connection.
  fn connected_users(&self) -> Vec<UserId>;

  /// Route by `event.target`: unicast when set, broadcast otherwise.
  fn dispatch(&self, event: &NotificationEvent) -> usize {
    match event.target {
      Some(user) => usize::from(self.send_to_user(user, event)),
      None => self.broadcast(event),
    }
  }
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
  fn send_to_user(&self, user: UserId, event: &NotificationEvent) -> bool {
    (**self).send_to_user(user, event)
  }

  fn send_to_users(&self, users: &[UserId], event: &NotificationEvent) -> usize {
    (**self).send_to_users(users, event)
  }

  fn broadcast(&self, event: &NotificationEvent) -> usize { (**self).broadcast(event) }

  fn connection_count(&self) -> usize { (**self).connection_count() }

  fn connected_users(&self) -> Vec<UserId> { (**self).connected_users() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::routing::Path;

  #[test]
  fn event_wire_shape() {
    let e = NotificationEvent::idea_routed(
      IdeaId(12),
      "Solar desalination",
      RoutingDecision::for_path(Path::Innovation),
      72.0,
    )
    .for_user(UserId(7));

    let json = serde_json::to_value(&e).unwrap();
    assert_eq!(json["type"], "project-update");
    assert_eq!(json["priority"], "medium");
    assert_eq!(json["userId"], 7);
    assert_eq!(json["data"]["kind"], "routing");
    assert_eq!(json["data"]["path"], "innovation");
    assert_eq!(json["data"]["partnerCategory"], "research_accelerator");
  }

  #[test]
  fn broadcast_event_omits_user() {
    let e = NotificationEvent::ai_suggestion("Try a pilot");
    let json = serde_json::to_value(&e).unwrap();
    assert!(json.get("userId").is_none());
    assert!(json.get("data").is_none());
  }

  #[test]
  fn server_message_distinguishes_control_from_notification() {
    let pong = serde_json::json!({ "type": "pong", "timestamp": Utc::now() });
    assert!(matches!(
      serde_json::from_value::<ServerMessage>(pong).unwrap(),
      ServerMessage::Control(ControlMessage::Pong { .. })
    ));

    let event = NotificationEvent::gate_decision("Pilot", "go");
    let text = serde_json::to_string(&ServerMessage::Notification(event.clone()))
      .unwrap();
    match serde_json::from_str::<ServerMessage>(&text).unwrap() {
      ServerMessage::Notification(back) => assert_eq!(back, event),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn client_ping_parses() {
    let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
    assert_eq!(msg, ClientMessage::Ping);
  }

  #[test]
  fn risk_priorities() {
    assert_eq!(
      NotificationEvent::high_risk_idea(IdeaId(1), "x", 80.0).priority,
      Priority::Urgent
    );
    assert_eq!(NotificationEvent::hypothesis_risk("h", 0.9).priority, Priority::High);
    assert!(Priority::Urgent > Priority::High);
  }

  #[test]
  fn kinds_and_priorities_parse_from_their_wire_names() {
    assert_eq!("gate-decision".parse::<NotificationKind>().unwrap(), NotificationKind::GateDecision);
    assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
    assert!("loud".parse::<Priority>().is_err());
  }
}
