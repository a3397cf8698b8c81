//! The matching engine: AI-assisted strategy with deterministic fallback,
//! bounded batch concurrency and a result cache.

use std::{sync::Arc, time::Duration};

use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uplink_core::{
  EvaluatorError,
  evaluator::MatchEvaluator,
  matching::{
    IdeaFeatures, MatchCandidate, OpportunityFeatures, deterministic_match, rank,
  },
};

use crate::cache::{MatchCache, cache_key};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
  /// When false the evaluator is never called.
  pub ai_enabled:      bool,
  pub ai_timeout_secs: u64,
  /// Upper bound on in-flight evaluator calls during a batch.
  pub max_concurrency: usize,
  pub cache_ttl_secs:  u64,
  /// Ranked candidates below this score are dropped.
  pub min_score:       f64,
}

impl Default for MatchingConfig {
  fn default() -> Self {
    Self {
      ai_enabled:      false,
      ai_timeout_secs: 20,
      max_concurrency: 4,
      cache_ttl_secs:  30 * 60,
      min_score:       0.0,
    }
  }
}

impl MatchingConfig {
  pub fn ai_timeout(&self) -> Duration { Duration::from_secs(self.ai_timeout_secs) }

  pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }
}

#[derive(Debug)]
pub struct MatchingEngine<E> {
  evaluator: E,
  config:    MatchingConfig,
  cache:     Arc<MatchCache>,
}

impl<E: MatchEvaluator> MatchingEngine<E> {
  pub fn new(evaluator: E, config: MatchingConfig, cache: Arc<MatchCache>) -> Self {
    Self { evaluator, config, cache }
  }

  pub fn config(&self) -> &MatchingConfig { &self.config }

  pub fn cache(&self) -> &MatchCache { &self.cache }

  /// Score one pair. Never fails: any evaluator error degrades to the
  /// deterministic strategy.
  pub async fn score_one(
    &self,
    idea: &IdeaFeatures,
    opportunity: &OpportunityFeatures,
  ) -> MatchCandidate {
    if !self.config.ai_enabled {
      return deterministic_match(idea, opportunity);
    }

    let key = cache_key(idea, opportunity);
    if let Some(hit) = self.cache.get(&key) {
      debug!(
        idea_id = %idea.idea_id,
        opportunity_id = %opportunity.opportunity_id,
        "match cache hit"
      );
      return hit;
    }

    let timeout = self.config.ai_timeout();
    let outcome =
      match tokio::time::timeout(timeout, self.evaluator.evaluate(idea, opportunity)).await {
        Ok(result) => result,
        Err(_) => Err(EvaluatorError::Timeout(timeout)),
      };

    match outcome {
      Ok(assessment) => {
        let candidate = assessment.into_candidate(idea, opportunity);
        self.cache.insert(key, candidate.clone());
        candidate
      }
      Err(e) => {
        warn!(
          idea_id = %idea.idea_id,
          opportunity_id = %opportunity.opportunity_id,
          error = %e,
          "AI match evaluation failed, falling back to deterministic scoring"
        );
        deterministic_match(idea, opportunity)
      }
    }
  }

  /// Score every candidate and rank the results.
  ///
  /// Evaluator calls run at most `max_concurrency` at a time; the output
  /// order depends only on the scores.
  pub async fn score(
    &self,
    idea: &IdeaFeatures,
    candidates: &[OpportunityFeatures],
  ) -> Vec<MatchCandidate> {
    let limit = self.config.max_concurrency.max(1);
    let pending: Vec<_> =
      candidates.iter().map(|opportunity| self.score_one(idea, opportunity)).collect();
    let scored: Vec<MatchCandidate> = stream::iter(pending)
      .buffer_unordered(limit)
      .collect()
      .await;

    let min_score = self.config.min_score;
    rank(scored)
      .into_iter()
      .filter(|c| c.match_score >= min_score)
      .collect()
  }
}
