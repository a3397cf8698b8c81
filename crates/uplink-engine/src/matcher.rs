//! AI-assisted match evaluator.

use serde_json::{Value, json};
use uplink_core::{
  EvaluatorError,
  evaluator::{MatchAssessment, MatchEvaluator},
  matching::{IdeaFeatures, OpportunityFeatures},
};

use crate::llm::LlmClient;

const SYSTEM_PROMPT: &str = "You are an expert at matching innovative ideas with \
  challenges, investors and companies. Answer in JSON only.";

#[derive(Debug, Clone)]
pub struct LlmMatchEvaluator {
  client: LlmClient,
}

impl LlmMatchEvaluator {
  pub fn new(client: LlmClient) -> Self { Self { client } }
}

fn schema() -> Value {
  let number = |d: &str| json!({ "type": "number", "description": d });
  json!({
    "type": "object",
    "properties": {
      "matchScore":         number("overall match, 0-100"),
      "keywordSimilarity":  number("keyword similarity, 0-100"),
      "categorySimilarity": number("category similarity, 0-100"),
      "semanticSimilarity": number("semantic similarity, 0-100"),
      "industrySimilarity": number("industry similarity, 0-100"),
      "reasoning":          { "type": "string" },
      "recommendations":    { "type": "array", "items": { "type": "string" } },
    },
    "required": [
      "matchScore",
      "keywordSimilarity",
      "categorySimilarity",
      "semanticSimilarity",
      "industrySimilarity",
      "reasoning",
      "recommendations",
    ],
    "additionalProperties": false,
  })
}

fn prompt(idea: &IdeaFeatures, opportunity: &OpportunityFeatures) -> String {
  let mut out = String::from("Idea:\n");
  out.push_str(&format!("- Title: {}\n", idea.title));
  out.push_str(&format!("- Description: {}\n", idea.description));
  if let Some(category) = &idea.category {
    out.push_str(&format!("- Category: {category}\n"));
  }
  if let Some(industry) = &idea.industry {
    out.push_str(&format!("- Industry: {industry}\n"));
  }
  if !idea.keywords.is_empty() {
    out.push_str(&format!("- Keywords: {}\n", idea.keywords.join(", ")));
  }

  out.push_str(&format!("\nOpportunity ({}):\n", opportunity.kind));
  out.push_str(&format!("- Title: {}\n", opportunity.title));
  out.push_str(&format!("- Description: {}\n", opportunity.description));
  if let Some(category) = &opportunity.category {
    out.push_str(&format!("- Category: {category}\n"));
  }
  if let Some(industry) = &opportunity.industry {
    out.push_str(&format!("- Industry: {industry}\n"));
  }

  out.push_str(
    "\nRate the match from 0 to 100 (80+ excellent, 60-79 good, 40-59 fair, \
     below 40 poor), rate each similarity from 0 to 100, explain the result \
     and suggest how the match could be improved.",
  );
  out
}

impl MatchEvaluator for LlmMatchEvaluator {
  async fn evaluate(
    &self,
    idea: &IdeaFeatures,
    opportunity: &OpportunityFeatures,
  ) -> Result<MatchAssessment, EvaluatorError> {
    self
      .client
      .complete_json(SYSTEM_PROMPT, &prompt(idea, opportunity), "match_analysis", schema())
      .await
  }
}
