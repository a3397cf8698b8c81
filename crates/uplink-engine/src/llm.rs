//! Minimal client for an OpenAI-compatible chat-completions endpoint that
//! returns structured JSON.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;
use uplink_core::EvaluatorError;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
  pub base_url:     String,
  pub api_key:      Option<String>,
  pub model:        String,
  pub timeout_secs: u64,
}

impl Default for LlmConfig {
  fn default() -> Self {
    Self {
      base_url:     "https://api.openai.com/v1".into(),
      api_key:      None,
      model:        "gpt-4o-mini".into(),
      timeout_secs: 60,
    }
  }
}

impl LlmConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

/// Cheap to clone; the inner [`reqwest::Client`] is reference-counted.
#[derive(Debug, Clone)]
pub struct LlmClient {
  http:   Client,
  config: LlmConfig,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

impl LlmClient {
  pub fn new(config: LlmConfig) -> Result<Self> {
    let http = Client::builder().timeout(config.timeout()).build()?;
    Ok(Self { http, config })
  }

  pub fn config(&self) -> &LlmConfig { &self.config }

  fn endpoint(&self) -> String {
    format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
  }

  /// Send one system + user exchange and decode the reply as `T`.
  ///
  /// `schema` is a JSON Schema object passed as a strict `json_schema`
  /// response format.
  pub async fn complete_json<T: DeserializeOwned>(
    &self,
    system: &str,
    user: &str,
    schema_name: &str,
    schema: Value,
  ) -> Result<T, EvaluatorError> {
    let body = json!({
      "model": self.config.model,
      "messages": [
        { "role": "system", "content": system },
        { "role": "user", "content": user },
      ],
      "response_format": {
        "type": "json_schema",
        "json_schema": { "name": schema_name, "strict": true, "schema": schema },
      },
    });

    let mut req = self.http.post(self.endpoint()).json(&body);
    if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
      req = req.bearer_auth(key);
    }

    debug!(model = %self.config.model, schema = schema_name, "calling LLM");
    let resp = req.send().await.map_err(|e| {
      if e.is_timeout() {
        EvaluatorError::Timeout(self.config.timeout())
      } else {
        EvaluatorError::Unavailable(e.to_string())
      }
    })?;

    let status = resp.status();
    if !status.is_success() {
      return Err(EvaluatorError::Unavailable(format!("LLM endpoint returned {status}")));
    }

    let chat: ChatResponse = resp
      .json()
      .await
      .map_err(|e| EvaluatorError::Malformed(e.to_string()))?;
    parse_reply(chat)
  }
}

fn parse_reply<T: DeserializeOwned>(chat: ChatResponse) -> Result<T, EvaluatorError> {
  let content = chat
    .choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .ok_or_else(|| EvaluatorError::Malformed("response has no content".into()))?;
  serde_json::from_str(strip_fences(&content))
    .map_err(|e| EvaluatorError::Malformed(e.to_string()))
}

/// Models sometimes wrap JSON in a Markdown code fence.
pub fn strip_fences(content: &str) -> &str {
  let trimmed = content.trim();
  let Some(rest) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  let rest = rest.strip_prefix("json").unwrap_or(rest);
  rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Deserialize, PartialEq)]
  struct Reply {
    score: f64,
  }

  fn chat(content: Option<&str>) -> ChatResponse {
    ChatResponse {
      choices: vec![Choice {
        message: ChoiceMessage { content: content.map(String::from) },
      }],
    }
  }

  #[test]
  fn strips_json_fence() {
    assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_fences("```\n{\"a\":1}```"), "{\"a\":1}");
    assert_eq!(strip_fences("  {\"a\":1} "), "{\"a\":1}");
  }

  #[test]
  fn parses_fenced_reply() {
    let reply: Reply = parse_reply(chat(Some("```json\n{\"score\": 81}\n```"))).unwrap();
    assert_eq!(reply, Reply { score: 81.0 });
  }

  #[test]
  fn missing_content_is_malformed() {
    let err = parse_reply::<Reply>(chat(None)).unwrap_err();
    assert!(matches!(err, EvaluatorError::Malformed(_)));
    let err = parse_reply::<Reply>(ChatResponse { choices: vec![] }).unwrap_err();
    assert!(matches!(err, EvaluatorError::Malformed(_)));
  }

  #[test]
  fn non_json_is_malformed() {
    let err = parse_reply::<Reply>(chat(Some("I think it scores well"))).unwrap_err();
    assert!(matches!(err, EvaluatorError::Malformed(_)));
  }

  #[test]
  fn endpoint_trims_slash() {
    let client = LlmClient::new(LlmConfig {
      base_url: "http://localhost:8080/v1/".into(),
      ..Default::default()
    })
    .unwrap();
    assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
  }
}
