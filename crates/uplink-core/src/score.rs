//! Multi-criteria score records and the aggregation rule.
//!
//! A [`ScoreRecord`] is created once per analysis run and never mutated;
//! re-analysis produces a new record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::{Error, Result, ids::IdeaId};

/// Sub-scores and aggregates live in this closed interval.
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

/// A `risk` sub-score at or above this value triggers a high-risk alert.
pub const HIGH_RISK_THRESHOLD: f64 = 75.0;

/// Clamp a possibly untrusted score into `[0, 100]`. `NaN` becomes `0`.
pub fn clamp_score(value: f64) -> f64 {
  if value.is_nan() {
    SCORE_MIN
  } else {
    value.clamp(SCORE_MIN, SCORE_MAX)
  }
}

fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

// ─── Criteria ────────────────────────────────────────────────────────────────

/// The ten named evaluation criteria.
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
  strum::EnumIter,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "snake_case")]
pub enum Criterion {
  Novelty,
  Feasibility,
  CommercialValue,
  SocialImpact,
  Scalability,
  Sustainability,
  /// Risk exposure: higher means riskier. Contributes `100 - risk`.
  Risk,
  TimeToMarket,
  CompetitiveAdvantage,
  OrganizationalReadiness,
}

/// Aggregation weights; they sum to 100.
pub const CRITERION_WEIGHTS: [(Criterion, f64); 10] = [
  (Criterion::Novelty, 15.0),
  (Criterion::Feasibility, 12.0),
  (Criterion::CommercialValue, 12.0),
  (Criterion::SocialImpact, 10.0),
  (Criterion::Scalability, 10.0),
  (Criterion::Sustainability, 8.0),
  (Criterion::Risk, 8.0),
  (Criterion::TimeToMarket, 8.0),
  (Criterion::CompetitiveAdvantage, 10.0),
  (Criterion::OrganizationalReadiness, 7.0),
];

impl Criterion {
  pub fn weight(self) -> f64 {
    CRITERION_WEIGHTS
      .iter()
      .find(|(c, _)| *c == self)
      .map(|(_, w)| *w)
      .unwrap_or(0.0)
  }

  /// Whether a high raw value is *bad* for the idea.
  pub fn is_inverted(self) -> bool { matches!(self, Self::Risk) }
}

// ─── Sub-scores ──────────────────────────────────────────────────────────────

/// One value per [`Criterion`], each nominally in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubScores {
  pub novelty:                  f64,
  pub feasibility:              f64,
  pub commercial_value:         f64,
  pub social_impact:            f64,
  pub scalability:              f64,
  pub sustainability:           f64,
  pub risk:                     f64,
  pub time_to_market:           f64,
  pub competitive_advantage:    f64,
  pub organizational_readiness: f64,
}

impl SubScores {
  /// Every criterion set to `value`.
  pub fn uniform(value: f64) -> Self {
    let mut scores = Self::default();
    for c in Criterion::iter() {
      *scores.get_mut(c) = value;
    }
    scores
  }

  pub fn get(&self, criterion: Criterion) -> f64 {
    match criterion {
      Criterion::Novelty => self.novelty,
      Criterion::Feasibility => self.feasibility,
      Criterion::CommercialValue => self.commercial_value,
      Criterion::SocialImpact => self.social_impact,
      Criterion::Scalability => self.scalability,
      Criterion::Sustainability => self.sustainability,
      Criterion::Risk => self.risk,
      Criterion::TimeToMarket => self.time_to_market,
      Criterion::CompetitiveAdvantage => self.competitive_advantage,
      Criterion::OrganizationalReadiness => self.organizational_readiness,
    }
  }

  pub fn get_mut(&mut self, criterion: Criterion) -> &mut f64 {
    match criterion {
      Criterion::Novelty => &mut self.novelty,
      Criterion::Feasibility => &mut self.feasibility,
      Criterion::CommercialValue => &mut self.commercial_value,
      Criterion::SocialImpact => &mut self.social_impact,
      Criterion::Scalability => &mut self.scalability,
      Criterion::Sustainability => &mut self.sustainability,
      Criterion::Risk => &mut self.risk,
      Criterion::TimeToMarket => &mut self.time_to_market,
      Criterion::CompetitiveAdvantage => &mut self.competitive_advantage,
      Criterion::OrganizationalReadiness => &mut self.organizational_readiness,
    }
  }

  /// Return a copy with every value clamped into `[0, 100]`.
  pub fn clamped(mut self) -> Self {
    for c in Criterion::iter() {
      let v = self.get_mut(c);
      *v = clamp_score(*v);
    }
    self
  }

  /// Fail on the first value outside `[0, 100]` (or `NaN`).
  pub fn validate(&self) -> Result<()> {
    for c in Criterion::iter() {
      let value = self.get(c);
      if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
        return Err(Error::ScoreOutOfRange { criterion: c, value });
      }
    }
    Ok(())
  }

  /// Weighted mean over [`CRITERION_WEIGHTS`], rounded to two decimals.
  /// Inverted criteria contribute `100 - value`.
  pub fn aggregate(&self) -> f64 {
    let total_weight: f64 = CRITERION_WEIGHTS.iter().map(|(_, w)| w).sum();
    let weighted: f64 = CRITERION_WEIGHTS
      .iter()
      .map(|&(c, w)| {
        let v = clamp_score(self.get(c));
        let v = if c.is_inverted() { SCORE_MAX - v } else { v };
        v * w
      })
      .sum();
    clamp_score(round2(weighted / total_weight))
  }
}

// ─── ScoreRecord ─────────────────────────────────────────────────────────────

/// The result of one analysis run. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
  pub record_id:     Uuid,
  pub idea_id:       IdeaId,
  pub sub_scores:    SubScores,
  pub overall_score: f64,
  pub evaluated_at:  DateTime<Utc>,
}

impl ScoreRecord {
  /// Strict constructor for trusted input: any out-of-range sub-score is an
  /// error.
  pub fn new(idea_id: IdeaId, sub_scores: SubScores) -> Result<Self> {
    sub_scores.validate()?;
    Ok(Self::build(idea_id, sub_scores))
  }

  /// Constructor for evaluator output: out-of-range values are clamped.
  pub fn from_untrusted(idea_id: IdeaId, sub_scores: SubScores) -> Self {
    Self::build(idea_id, sub_scores.clamped())
  }

  fn build(idea_id: IdeaId, sub_scores: SubScores) -> Self {
    Self {
      record_id: Uuid::new_v4(),
      idea_id,
      overall_score: sub_scores.aggregate(),
      sub_scores,
      evaluated_at: Utc::now(),
    }
  }

  /// Check a record that arrived from outside (e.g. decoded from storage).
  pub fn validate(&self) -> Result<()> {
    self.sub_scores.validate()?;
    if !(SCORE_MIN..=SCORE_MAX).contains(&self.overall_score) {
      return Err(Error::OverallOutOfRange(self.overall_score));
    }
    Ok(())
  }

  pub fn is_high_risk(&self) -> bool {
    self.sub_scores.risk >= HIGH_RISK_THRESHOLD
  }
}
