//! Match candidates and the deterministic matching strategy.
//!
//! The deterministic strategy needs no network and is the fallback for the
//! AI-assisted strategy. Its weights:
//!
//! | Component | Weight |
//! |-----------|--------|
//! | category exact / partial match | 40 |
//! | keyword-overlap fraction | 30 |
//! | title-token overlap (tokens longer than 3 chars) | 20 |
//! | description-token overlap (first 20 tokens, longer than 4 chars) | 10 |

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
  ids::{IdeaId, OpportunityId},
  score::{SCORE_MAX, clamp_score},
};

pub const CATEGORY_WEIGHT: f64 = 40.0;
pub const KEYWORD_WEIGHT: f64 = 30.0;
pub const TITLE_WEIGHT: f64 = 20.0;
pub const DESCRIPTION_WEIGHT: f64 = 10.0;

/// Only this many leading description tokens are compared.
pub const DESCRIPTION_PREFIX_TOKENS: usize = 20;
const TITLE_MIN_TOKEN_CHARS: usize = 4;
const DESCRIPTION_MIN_TOKEN_CHARS: usize = 5;

// ─── Features ────────────────────────────────────────────────────────────────

/// The descriptive side of an idea used for matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaFeatures {
  pub idea_id:     IdeaId,
  pub title:       String,
  pub description: String,
  pub category:    Option<String>,
  pub industry:    Option<String>,
  #[serde(default)]
  pub keywords:    Vec<String>,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OpportunityKind {
  Challenge,
  Investor,
  Company,
}

/// The descriptive side of one opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityFeatures {
  pub opportunity_id: OpportunityId,
  pub kind:           OpportunityKind,
  pub title:          String,
  pub description:    String,
  pub category:       Option<String>,
  pub industry:       Option<String>,
}

// ─── Candidate ───────────────────────────────────────────────────────────────

/// The four component similarities, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Similarity {
  pub keyword:  f64,
  pub category: f64,
  pub semantic: f64,
  pub industry: f64,
}

impl Similarity {
  pub fn clamped(self) -> Self {
    Self {
      keyword:  clamp_score(self.keyword),
      category: clamp_score(self.category),
      semantic: clamp_score(self.semantic),
      industry: clamp_score(self.industry),
    }
  }
}

/// Which strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
  AiAssisted,
  Deterministic,
}

/// One idea paired with one opportunity. Recomputed, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
  pub idea_id:          IdeaId,
  pub opportunity_id:   OpportunityId,
  pub opportunity_kind: OpportunityKind,
  pub similarity:       Similarity,
  pub match_score:      f64,
  pub reasoning:        String,
  pub recommendations:  Vec<String>,
  pub strategy:         MatchStrategy,
}

impl MatchCandidate {
  /// Enforce the `[0, 100]` post-condition on every score.
  pub fn clamped(mut self) -> Self {
    self.similarity = self.similarity.clamped();
    self.match_score = clamp_score(self.match_score);
    self
  }

  pub fn tier(&self) -> MatchTier { MatchTier::for_score(self.match_score) }
}

/// Coarse quality band for a match score.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchTier {
  Excellent,
  Good,
  Fair,
  Poor,
}

impl MatchTier {
  pub fn for_score(score: f64) -> Self {
    if score >= 80.0 {
      Self::Excellent
    } else if score >= 60.0 {
      Self::Good
    } else if score >= 40.0 {
      Self::Fair
    } else {
      Self::Poor
    }
  }
}

/// Order candidates by descending score, then ascending opportunity id.
pub fn rank(mut candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
  candidates.sort_by(|a, b| {
    b.match_score
      .partial_cmp(&a.match_score)
      .unwrap_or(Ordering::Equal)
      .then_with(|| a.opportunity_id.cmp(&b.opportunity_id))
  });
  candidates
}

// ─── Deterministic strategy ──────────────────────────────────────────────────

fn normalise(s: Option<&str>) -> Option<String> {
  s.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}

/// 100 for an exact (case-insensitive) match, 50 when one contains the
/// other, 0 otherwise or when either side is missing.
fn label_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
  match (normalise(a), normalise(b)) {
    (Some(a), Some(b)) if a == b => SCORE_MAX,
    (Some(a), Some(b)) if a.contains(&b) || b.contains(&a) => SCORE_MAX / 2.0,
    _ => 0.0,
  }
}

fn tokens(s: &str) -> Vec<String> {
  s.split_whitespace().map(str::to_lowercase).collect()
}

/// Fraction of `a`'s long-enough tokens that also appear in `b`, over the
/// longer of the two token lists.
fn token_overlap(a: &[String], b: &[String], min_chars: usize) -> f64 {
  let longest = a.len().max(b.len());
  if longest == 0 {
    return 0.0;
  }
  let common = a
    .iter()
    .filter(|t| t.chars().count() >= min_chars && b.contains(t))
    .count();
  common as f64 / longest as f64
}

fn keyword_fraction(keywords: &[String], haystack: &str) -> f64 {
  let keywords: Vec<String> = keywords
    .iter()
    .map(|k| k.trim().to_lowercase())
    .filter(|k| !k.is_empty())
    .collect();
  if keywords.is_empty() {
    return 0.0;
  }
  let hits = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
  hits as f64 / keywords.len() as f64
}

/// Score one idea/opportunity pair without any external call.
///
/// Pure: the same input always yields the same output.
pub fn deterministic_match(
  idea: &IdeaFeatures,
  opportunity: &OpportunityFeatures,
) -> MatchCandidate {
  let category = label_similarity(
    idea.category.as_deref(),
    opportunity.category.as_deref(),
  );

  let haystack = format!("{} {}", opportunity.title, opportunity.description)
    .to_lowercase();
  let keyword = keyword_fraction(&idea.keywords, &haystack);

  let title = token_overlap(
    &tokens(&idea.title),
    &tokens(&opportunity.title),
    TITLE_MIN_TOKEN_CHARS,
  );

  let idea_desc: Vec<String> = tokens(&idea.description)
    .into_iter()
    .take(DESCRIPTION_PREFIX_TOKENS)
    .collect();
  let opp_desc: Vec<String> = tokens(&opportunity.description)
    .into_iter()
    .take(DESCRIPTION_PREFIX_TOKENS)
    .collect();
  let description =
    token_overlap(&idea_desc, &opp_desc, DESCRIPTION_MIN_TOKEN_CHARS);

  let industry = label_similarity(
    idea.industry.as_deref().or(idea.category.as_deref()),
    opportunity.industry.as_deref(),
  );

  let raw = category / SCORE_MAX * CATEGORY_WEIGHT
    + keyword * KEYWORD_WEIGHT
    + title * TITLE_WEIGHT
    + description * DESCRIPTION_WEIGHT;
  let match_score = raw.round();

  let semantic = (title * TITLE_WEIGHT + description * DESCRIPTION_WEIGHT)
    / (TITLE_WEIGHT + DESCRIPTION_WEIGHT)
    * SCORE_MAX;

  let similarity = Similarity {
    keyword: keyword * SCORE_MAX,
    category,
    semantic,
    industry,
  };

  MatchCandidate {
    idea_id: idea.idea_id,
    opportunity_id: opportunity.opportunity_id,
    opportunity_kind: opportunity.kind,
    reasoning: reasoning(&similarity, match_score),
    recommendations: recommendations(&similarity),
    similarity,
    match_score,
    strategy: MatchStrategy::Deterministic,
  }
  .clamped()
}

fn reasoning(s: &Similarity, match_score: f64) -> String {
  format!(
    "{} match ({match_score:.0}/100): category {:.0}, keywords {:.0}, \
     text overlap {:.0}, industry {:.0}",
    MatchTier::for_score(match_score),
    s.category,
    s.keyword,
    s.semantic,
    s.industry,
  )
}

fn recommendations(s: &Similarity) -> Vec<String> {
  let mut out = Vec::new();
  if s.category < SCORE_MAX {
    out.push("Align the idea's category with the opportunity's focus area".to_owned());
  }
  if s.keyword < 50.0 {
    out.push("Add keywords that reflect the opportunity's stated needs".to_owned());
  }
  if s.semantic < 30.0 {
    out.push("Describe the problem using the opportunity's terminology".to_owned());
  }
  if s.industry == 0.0 {
    out.push("State the target industry explicitly".to_owned());
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn idea() -> IdeaFeatures {
    IdeaFeatures {
      idea_id:     IdeaId(1),
      title:       "Smart water leak detection".into(),
      description: "Sensors detect leaks in municipal water pipes and alert \
                    operators before damage spreads"
        .into(),
      category:    Some("Water".into()),
      industry:    Some("Utilities".into()),
      keywords:    vec!["sensors".into(), "leak".into(), "drones".into()],
    }
  }

  fn opportunity(id: i64) -> OpportunityFeatures {
    OpportunityFeatures {
      opportunity_id: OpportunityId(id),
      kind:           OpportunityKind::Challenge,
      title:          "Water leak reduction challenge".into(),
      description:    "Reduce leaks in municipal water networks using sensors"
        .into(),
      category:       Some("water".into()),
      industry:       Some("utilities".into()),
    }
  }

  #[test]
  fn exact_category_and_partial_overlaps() {
    let m = deterministic_match(&idea(), &opportunity(7));
    assert_eq!(m.similarity.category, 100.0);
    assert_eq!(m.similarity.industry, 100.0);
    // "sensors" and "leak" appear; "drones" does not.
    assert!((m.similarity.keyword - 200.0 / 3.0).abs() < 1e-9);
    // category 40 + keywords 20 + title ("water", "leak") 2/4 * 20 = 10
    // + description: 13 vs 8 tokens, common longer than 4 chars are
    // "sensors", "leaks", "municipal", "water" → 4/13 * 10 ≈ 3.08
    assert_eq!(m.match_score, 73.0);
    assert_eq!(m.strategy, MatchStrategy::Deterministic);
    assert_eq!(m.opportunity_id, OpportunityId(7));
  }

  #[test]
  fn partial_category_scores_half() {
    let mut opp = opportunity(1);
    opp.category = Some("water management".into());
    let m = deterministic_match(&idea(), &opp);
    assert_eq!(m.similarity.category, 50.0);
  }

  #[test]
  fn missing_category_scores_zero() {
    let mut opp = opportunity(1);
    opp.category = None;
    let m = deterministic_match(&idea(), &opp);
    assert_eq!(m.similarity.category, 0.0);
  }

  #[test]
  fn is_pure() {
    let a = deterministic_match(&idea(), &opportunity(3));
    let b = deterministic_match(&idea(), &opportunity(3));
    assert_eq!(a, b);
  }

  #[test]
  fn empty_inputs_stay_in_bounds() {
    let empty_idea = IdeaFeatures {
      idea_id:     IdeaId(1),
      title:       String::new(),
      description: String::new(),
      category:    None,
      industry:    None,
      keywords:    vec![],
    };
    let empty_opp = OpportunityFeatures {
      opportunity_id: OpportunityId(1),
      kind:           OpportunityKind::Investor,
      title:          String::new(),
      description:    String::new(),
      category:       None,
      industry:       None,
    };
    let m = deterministic_match(&empty_idea, &empty_opp);
    assert_eq!(m.match_score, 0.0);
    assert_eq!(m.similarity, Similarity::default());
  }

  #[test]
  fn identical_texts_reach_the_top_of_the_range() {
    let i = idea();
    let opp = OpportunityFeatures {
      opportunity_id: OpportunityId(1),
      kind:           OpportunityKind::Company,
      title:          "leak detection smart water sensors".into(),
      description:    i.description.clone(),
      category:       i.category.clone(),
      industry:       i.industry.clone(),
    };
    let m = deterministic_match(&i, &opp);
    assert!(m.match_score <= 100.0);
    assert!(m.match_score >= 80.0);
    assert_eq!(m.tier(), MatchTier::Excellent);
  }

  #[test]
  fn clamping_handles_adversarial_values() {
    let m = MatchCandidate {
      idea_id:          IdeaId(1),
      opportunity_id:   OpportunityId(1),
      opportunity_kind: OpportunityKind::Company,
      similarity:       Similarity {
        keyword:  -5.0,
        category: 500.0,
        semantic: f64::NAN,
        industry: f64::INFINITY,
      },
      match_score:      1e9,
      reasoning:        String::new(),
      recommendations:  vec![],
      strategy:         MatchStrategy::AiAssisted,
    }
    .clamped();
    assert_eq!(m.match_score, 100.0);
    assert_eq!(m.similarity.keyword, 0.0);
    assert_eq!(m.similarity.category, 100.0);
    assert_eq!(m.similarity.semantic, 0.0);
    assert_eq!(m.similarity.industry, 100.0);
  }

  #[test]
  fn rank_sorts_descending_with_id_tiebreak() {
    let base = deterministic_match(&idea(), &opportunity(1));
    let with = |id: i64, score: f64| MatchCandidate {
      opportunity_id: OpportunityId(id),
      match_score: score,
      ..base.clone()
    };
    let ranked = rank(vec![with(5, 40.0), with(2, 90.0), with(9, 40.0), with(1, 40.0)]);
    let order: Vec<i64> = ranked.iter().map(|c| c.opportunity_id.0).collect();
    assert_eq!(order, vec![2, 1, 5, 9]);
  }

  #[test]
  fn tiers() {
    assert_eq!(MatchTier::for_score(80.0), MatchTier::Excellent);
    assert_eq!(MatchTier::for_score(79.9), MatchTier::Good);
    assert_eq!(MatchTier::for_score(40.0), MatchTier::Fair);
    assert_eq!(MatchTier::for_score(39.0), MatchTier::Poor);
  }
}
