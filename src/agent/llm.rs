//! LLM client for OpenAI-compatible chat completion APIs (OpenRouter by default)

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

// ============ Provider Configuration ============

/// Configuration for an LLM API provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL for the API (e.g., "https://openrouter.ai/api/v1")
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
    /// Extra headers to include in requests (e.g., X-Title, HTTP-Referer)
    pub extra_headers: Vec<(String, String)>,
    /// Whether to include `transforms: []` in requests (OpenRouter-specific)
    pub include_transforms: bool,
}

impl ProviderConfig {
    /// Create an OpenRouter provider configuration
    pub fn openrouter(api_key: String) -> Self {
        Self {
            base_url: OPENROUTER_BASE_URL.to_string(),
            api_key,
            extra_headers: vec![("X-Title".to_string(), "Pref Learner".to_string())],
            include_transforms: true,
        }
    }

    /// Any other OpenAI-compatible endpoint
    pub fn custom(api_key: String, base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            extra_headers: Vec::new(),
            include_transforms: false,
        }
    }

    /// Pick the provider type from a base URL
    pub fn for_base_url(api_key: String, base_url: &str) -> Self {
        if base_url.trim_end_matches('/') == OPENROUTER_BASE_URL {
            Self::openrouter(api_key)
        } else {
            Self::custom(api_key, base_url.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transforms: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(Value::String(content.into())),
            tool_calls: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(Value::String(content.into())),
            tool_calls: None,
        }
    }

    /// Extract content as plain text, handling both string and array-of-content-parts formats.
    /// Some models return content as `"hello"`, others as `[{"type":"text","text":"hello"}]`.
    pub fn content_as_text(&self) -> Option<String> {
        self.content.as_ref().and_then(content_text)
    }
}

fn content_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter(|part| part.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join(""))
            }
        }
        Value::Null => None,
        // Numbers and other scalars are stringified
        other => Some(other.to_string()),
    }
}

/// Tool definition for OpenAI-compatible function calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub r#type: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// `tool_choice` value forcing a call to this tool
    pub fn forced_choice(&self) -> Value {
        serde_json::json!({ "type": "function", "function": { "name": self.function.name } })
    }
}

/// Function definition for tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool call from LLM response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub r#type: String,
    pub function: FunctionCall,
}

/// Function call details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    /// Arguments can arrive as either a JSON string or a raw JSON object
    /// depending on the model. We normalize to a string for downstream use.
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: String,
}

/// Deserialize arguments that may be a JSON string or a JSON object/map.
fn deserialize_arguments<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

/// LLM API client (OpenRouter and other OpenAI-compatible providers)
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Arc<Client>,
    provider: ProviderConfig,
}

impl OpenRouterClient {
    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(config: ProviderConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            provider: config,
        })
    }

    /// Create client from config (API key from env, keyring or key file)
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let api_key = crate::security::keyring::get_api_key()?;
        let provider = ProviderConfig::for_base_url(api_key, &config.llm.base_url);
        Self::with_timeout(provider, Duration::from_secs(config.llm.request_timeout_secs))
    }

    /// Send a chat completion request, returning the first choice's text
    pub async fn complete(&self, model: &str, messages: Vec<ChatMessage>, max_tokens: Option<u32>) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages,
            max_tokens,
            transforms: self.transforms(),
            tools: None,
            tool_choice: None,
        };

        let message = self.send(&request).await?;
        Ok(message.content_as_text().unwrap_or_default())
    }

    /// Send a chat completion request that must call `tool`
    pub async fn complete_with_tool(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tool: ToolDefinition,
        max_tokens: Option<u32>,
    ) -> Result<ChatMessage> {
        let tool_choice = tool.forced_choice();
        let request = ChatRequest {
            model: model.to_string(),
            messages,
            max_tokens,
            transforms: self.transforms(),
            tools: Some(vec![tool]),
            tool_choice: Some(tool_choice),
        };

        self.send(&request).await
    }

    fn transforms(&self) -> Option<Vec<Value>> {
        if self.provider.include_transforms {
            Some(vec![])
        } else {
            None
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatMessage> {
        debug!("LLM request: model {}, {} messages", request.model, request.messages.len());

        let mut req_builder = self
            .client
            .post(format!("{}/chat/completions", self.provider.base_url))
            .header("Authorization", format!("Bearer {}", self.provider.api_key));
        for (key, value) in &self.provider.extra_headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }
        let response = req_builder
            .json(request)
            .send()
            .await
            .context("Failed to send request to LLM provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("LLM API error ({}): {}", status, truncate(&body, 500));
        }

        let body = response.text().await.context("Failed to read response body")?;
        trace!("LLM response: {}", truncate(&body, 2000));

        parse_completion(&body)
    }
}

/// Pull the first choice's message out of a completion body.
///
/// Parsed as a raw `Value` first: strict struct deserialization breaks on
/// models that return non-standard field types.
pub fn parse_completion(body: &str) -> Result<ChatMessage> {
    let raw: Value = serde_json::from_str(body.trim())
        .map_err(|e| anyhow!("Failed to parse JSON response: {} (body: {})", e, truncate(body, 500)))?;

    let message = raw
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No message in response"))?;

    let tool_calls: Option<Vec<ToolCall>> = message
        .get("tool_calls")
        .and_then(|tc| tc.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|tc| serde_json::from_value::<ToolCall>(tc.clone()).ok())
                .collect()
        });

    Ok(ChatMessage {
        role: message
            .get("role")
            .and_then(|r| r.as_str())
            .unwrap_or("assistant")
            .to_string(),
        content: message.get("content").cloned(),
        tool_calls,
    })
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
