//! Model-backed implementations of the learning capabilities

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::llm::{ChatMessage, OpenRouterClient, ToolDefinition};
use super::prompts::{self, SUBMIT_OBSERVATIONS_TOOL};
use crate::error::CollaboratorError;
use crate::learning::{ClassifierRequest, ObservationClassifier, RuleWriter, Summarizer};
use crate::types::{CandidateObservation, Rule};

const SUMMARY_MAX_TOKENS: u32 = 256;
const CLASSIFY_MAX_TOKENS: u32 = 1024;
const RULE_MAX_TOKENS: u32 = 200;

/// One chat model serving classification, rule writing and summarization
#[derive(Clone)]
pub struct LlmCollaborator {
    client: OpenRouterClient,
    model: String,
}

impl LlmCollaborator {
    pub fn new(client: OpenRouterClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

fn transport(err: anyhow::Error) -> CollaboratorError {
    CollaboratorError::Transport(format!("{:#}", err))
}

/// Tool schema for the classifier's single submission
pub fn submit_observations_tool() -> ToolDefinition {
    ToolDefinition::function(
        SUBMIT_OBSERVATIONS_TOOL,
        "Return the unified observations list reflecting the user's preferences and counts.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "observations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "observation": { "type": "string" },
                            "count": { "type": "integer" }
                        },
                        "required": ["observation", "count"]
                    }
                }
            },
            "required": ["observations"]
        }),
    )
}

/// Parse `{"observations": [{"observation": .., "count": ..}]}`.
///
/// Counts given as numeric strings or integral floats are accepted.
pub fn parse_observations(payload: &str) -> Result<Vec<CandidateObservation>, CollaboratorError> {
    let payload = strip_code_fence(payload);
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| CollaboratorError::Content(format!("observations are not valid JSON: {}", e)))?;

    let items = value
        .get("observations")
        .and_then(|o| o.as_array())
        .ok_or_else(|| CollaboratorError::Content("missing 'observations' array".to_string()))?;

    items
        .iter()
        .map(|item| {
            let observation = item
                .get("observation")
                .or_else(|| item.get("text"))
                .and_then(|o| o.as_str())
                .ok_or_else(|| CollaboratorError::Content(format!("observation text is not a string: {}", item)))?;
            let count = item
                .get("count")
                .and_then(coerce_count)
                .ok_or_else(|| CollaboratorError::Content(format!("count is not an integer: {}", item)))?;
            Ok(CandidateObservation::new(observation, count))
        })
        .collect()
}

fn coerce_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn strip_code_fence(s: &str) -> &str {
    let trimmed = s.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

#[async_trait]
impl ObservationClassifier for LlmCollaborator {
    async fn classify(&self, request: &ClassifierRequest) -> Result<Vec<CandidateObservation>, CollaboratorError> {
        let messages = vec![ChatMessage::user(prompts::observations_prompt(request))];
        let message = self
            .client
            .complete_with_tool(&self.model, messages, submit_observations_tool(), Some(CLASSIFY_MAX_TOKENS))
            .await
            .map_err(transport)?;

        let submitted = message
            .tool_calls
            .as_ref()
            .and_then(|calls| calls.iter().find(|c| c.function.name == SUBMIT_OBSERVATIONS_TOOL));

        match submitted {
            Some(call) => parse_observations(&call.function.arguments),
            None => {
                debug!("Classifier answered without a tool call, parsing content");
                let content = message
                    .content_as_text()
                    .ok_or_else(|| CollaboratorError::Content("no observations submitted".to_string()))?;
                parse_observations(&content)
            }
        }
    }
}

#[async_trait]
impl RuleWriter for LlmCollaborator {
    async fn write_rule(&self, observation: &str, existing_rules: &[Rule]) -> Result<String, CollaboratorError> {
        let messages = vec![ChatMessage::user(prompts::rule_prompt(observation, existing_rules))];
        self.client
            .complete(&self.model, messages, Some(RULE_MAX_TOKENS))
            .await
            .map_err(transport)
    }
}

#[async_trait]
impl Summarizer for LlmCollaborator {
    async fn summarize(&self, source_document: &str, rules: &[Rule]) -> Result<String, CollaboratorError> {
        let messages = vec![
            ChatMessage::system(prompts::SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(prompts::summary_prompt(rules, source_document)),
        ];
        self.client
            .complete(&self.model, messages, Some(SUMMARY_MAX_TOKENS))
            .await
            .map_err(transport)
    }
}
