//! Scorer adapter: asks the LLM for the ten criterion sub-scores.

use serde_json::{Map, Value, json};
use uplink_core::{
  EvaluatorError,
  evaluator::IdeaScorer,
  idea::IdeaSubmission,
  score::{CRITERION_WEIGHTS, Criterion, SubScores},
};

use crate::llm::LlmClient;

const SYSTEM_PROMPT: &str = "You are an expert evaluator of innovative ideas and \
  early-stage ventures. Score objectively and answer in JSON only.";

#[derive(Debug, Clone)]
pub struct LlmScorer {
  client: LlmClient,
}

impl LlmScorer {
  pub fn new(client: LlmClient) -> Self { Self { client } }
}

/// The JSON field name of a criterion, matching `SubScores`' serde names.
fn criterion_key(c: Criterion) -> String {
  serde_json::to_value(c)
    .ok()
    .and_then(|v| v.as_str().map(str::to_owned))
    .unwrap_or_else(|| c.to_string())
}

fn schema() -> Value {
  let mut properties = Map::new();
  let mut required = Vec::new();
  for (criterion, _) in CRITERION_WEIGHTS {
    let key = criterion_key(criterion);
    properties.insert(
      key.clone(),
      json!({ "type": "number", "description": format!("{criterion} score (0-100)") }),
    );
    required.push(Value::String(key));
  }
  json!({
    "type": "object",
    "properties": properties,
    "required": required,
    "additionalProperties": false,
  })
}

fn prompt(idea: &IdeaSubmission) -> String {
  let unspecified = "unspecified";
  let mut out = format!(
    "Evaluate the following idea.\n\n\
     Title: {}\n\
     Description: {}\n\
     Category: {}\n\
     Industry: {}\n",
    idea.title,
    idea.description,
    idea.category.as_deref().unwrap_or(unspecified),
    idea.industry.as_deref().unwrap_or(unspecified),
  );
  if !idea.keywords.is_empty() {
    out.push_str(&format!("Keywords: {}\n", idea.keywords.join(", ")));
  }
  out.push_str(
    "\nScore each criterion from 0 to 100. For `risk`, a higher value means \
     the idea is riskier.",
  );
  out
}

impl IdeaScorer for LlmScorer {
  async fn score(&self, idea: &IdeaSubmission) -> Result<SubScores, EvaluatorError> {
    self
      .client
      .complete_json(SYSTEM_PROMPT, &prompt(idea), "idea_evaluation", schema())
      .await
  }
}

#[cfg(test)]
mod tests {
  use uplink_core::{IdeaId, UserId};

  use super::*;

  #[test]
  fn schema_lists_every_criterion_by_wire_name() {
    let schema = schema();
    let required = schema["required"].as_array().unwrap();
    assert_eq!(required.len(), 10);
    assert!(schema["properties"]["commercialValue"].is_object());
    assert!(schema["properties"]["organizationalReadiness"].is_object());

    // The names line up with what `SubScores` deserialises.
    let mut reply = Map::new();
    for key in required {
      reply.insert(key.as_str().unwrap().to_owned(), json!(50));
    }
    let parsed: SubScores = serde_json::from_value(Value::Object(reply)).unwrap();
    assert_eq!(parsed, SubScores::uniform(50.0));
  }

  #[test]
  fn prompt_mentions_the_idea() {
    let idea = IdeaSubmission {
      idea_id:     IdeaId(1),
      owner_id:    UserId(2),
      title:       "Solar drones".into(),
      description: "Autonomous inspection".into(),
      category:    None,
      industry:    Some("energy".into()),
      keywords:    vec!["solar".into(), "drone".into()],
    };
    let p = prompt(&idea);
    assert!(p.contains("Solar drones"));
    assert!(p.contains("Category: unspecified"));
    assert!(p.contains("Industry: energy"));
    assert!(p.contains("Keywords: solar, drone"));
  }
}
