//! External AI evaluator seams.
//!
//! Both traits describe fallible, slow, untrusted collaborators. Their output
//! is clamped by the consumer, and every failure is recoverable.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  EvaluatorError,
  idea::IdeaSubmission,
  matching::{
    IdeaFeatures, MatchCandidate, MatchStrategy, OpportunityFeatures, Similarity,
  },
  score::SubScores,
};

/// Produces raw multi-criteria sub-scores for an idea.
pub trait IdeaScorer: Send + Sync {
  fn score<'a>(
    &'a self,
    idea: &'a IdeaSubmission,
  ) -> impl Future<Output = Result<SubScores, EvaluatorError>> + Send + 'a;
}

/// AI-derived fields of a match, exactly as the evaluator returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAssessment {
  pub match_score:         f64,
  pub keyword_similarity:  f64,
  pub category_similarity: f64,
  pub semantic_similarity: f64,
  pub industry_similarity: f64,
  #[serde(default)]
  pub reasoning:           String,
  #[serde(default)]
  pub recommendations:     Vec<String>,
}

impl MatchAssessment {
  /// Attach the pair identity and clamp every score.
  pub fn into_candidate(
    self,
    idea: &IdeaFeatures,
    opportunity: &OpportunityFeatures,
  ) -> MatchCandidate {
    MatchCandidate {
      idea_id:          idea.idea_id,
      opportunity_id:   opportunity.opportunity_id,
      opportunity_kind: opportunity.kind,
      similarity:       Similarity {
        keyword:  self.keyword_similarity,
        category: self.category_similarity,
        semantic: self.semantic_similarity,
        industry: self.industry_similarity,
      },
      match_score:      self.match_score,
      reasoning:        self.reasoning,
      recommendations:  self.recommendations,
      strategy:         MatchStrategy::AiAssisted,
    }
    .clamped()
  }
}

/// Assesses one idea/opportunity pair.
pub trait MatchEvaluator: Send + Sync {
  fn evaluate<'a>(
    &'a self,
    idea: &'a IdeaFeatures,
    opportunity: &'a OpportunityFeatures,
  ) -> impl Future<Output = Result<MatchAssessment, EvaluatorError>> + Send + 'a;
}

/// An evaluator that is switched off. Every call fails with
/// [`EvaluatorError::Disabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

impl IdeaScorer for Disabled {
  async fn score(&self, _idea: &IdeaSubmission) -> Result<SubScores, EvaluatorError> {
    Err(EvaluatorError::Disabled)
  }
}

impl MatchEvaluator for Disabled {
  async fn evaluate(
    &self,
    _idea: &IdeaFeatures,
    _opportunity: &OpportunityFeatures,
  ) -> Result<MatchAssessment, EvaluatorError> {
    Err(EvaluatorError::Disabled)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    ids::{IdeaId, OpportunityId},
    matching::OpportunityKind,
  };

  #[test]
  fn assessment_is_clamped_into_candidate() {
    let idea = IdeaFeatures {
      idea_id:     IdeaId(1),
      title:       "t".into(),
      description: "d".into(),
      category:    None,
      industry:    None,
      keywords:    vec![],
    };
    let opp = OpportunityFeatures {
      opportunity_id: OpportunityId(2),
      kind:           OpportunityKind::Investor,
      title:          "t".into(),
      description:    "d".into(),
      category:       None,
      industry:       None,
    };
    let candidate = MatchAssessment {
      match_score:         140.0,
      keyword_similarity:  -3.0,
      category_similarity: 50.0,
      semantic_similarity: 100.5,
      industry_similarity: f64::NAN,
      reasoning:           "strong".into(),
      recommendations:     vec![],
    }
    .into_candidate(&idea, &opp);

    assert_eq!(candidate.match_score, 100.0);
    assert_eq!(candidate.similarity.keyword, 0.0);
    assert_eq!(candidate.similarity.category, 50.0);
    assert_eq!(candidate.similarity.semantic, 100.0);
    assert_eq!(candidate.similarity.industry, 0.0);
    assert_eq!(candidate.strategy, MatchStrategy::AiAssisted);
    assert_eq!(candidate.opportunity_id, OpportunityId(2));
  }
}
