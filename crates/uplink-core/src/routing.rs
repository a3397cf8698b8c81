//! Classification engine: score record → routing decision.
//!
//! Pure and total. Callers emit the resulting journey event and
//! notification.

use serde::{Deserialize, Serialize};

use crate::score::ScoreRecord;

/// Lower bound (inclusive) of the innovation path.
pub const INNOVATION_THRESHOLD: f64 = 70.0;
/// Lower bound (inclusive) of the commercial path.
pub const COMMERCIAL_THRESHOLD: f64 = 60.0;

/// The three coarse outcomes of classification.
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
  strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Path {
  Innovation,
  Commercial,
  Guidance,
}

impl Path {
  /// Threshold table. `NaN` falls through to guidance.
  pub fn for_score(overall_score: f64) -> Self {
    if overall_score >= INNOVATION_THRESHOLD {
      Self::Innovation
    } else if overall_score >= COMMERCIAL_THRESHOLD {
      Self::Commercial
    } else {
      Self::Guidance
    }
  }
}

/// Partner archetypes an idea can be pointed towards.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PartnerCategory {
  /// University research centres and accelerators.
  ResearchAccelerator,
  /// Small and medium enterprise support authorities.
  SmeSupport,
  /// Research, development and innovation guidance bodies.
  RdGuidance,
}

impl PartnerCategory {
  pub fn label(self) -> &'static str {
    match self {
      Self::ResearchAccelerator => "research / accelerator partner",
      Self::SmeSupport => "SME-support partner",
      Self::RdGuidance => "R&D-guidance partner",
    }
  }
}

/// Path → suggested partner category. Extend here, not in [`classify`].
pub const PARTNER_TABLE: [(Path, PartnerCategory); 3] = [
  (Path::Innovation, PartnerCategory::ResearchAccelerator),
  (Path::Commercial, PartnerCategory::SmeSupport),
  (Path::Guidance, PartnerCategory::RdGuidance),
];

pub fn partner_for(path: Path) -> PartnerCategory {
  PARTNER_TABLE
    .iter()
    .find(|(p, _)| *p == path)
    .map(|(_, c)| *c)
    .unwrap_or(PartnerCategory::RdGuidance)
}

/// Derived from a [`ScoreRecord`]; never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
  pub path:                       Path,
  pub suggested_partner_category: PartnerCategory,
}

impl RoutingDecision {
  pub fn for_path(path: Path) -> Self {
    Self { path, suggested_partner_category: partner_for(path) }
  }

  /// Ideas at or above the commercial threshold may go on to matching and
  /// contracting.
  pub fn can_advance(&self) -> bool { self.path != Path::Guidance }
}

/// Classify a score record.
pub fn classify(score: &ScoreRecord) -> RoutingDecision {
  RoutingDecision::for_path(Path::for_score(score.overall_score))
}
