//! The completion client: OpenAI chat completions with schema-constrained
//! JSON output, plus a mock for tests and test mode.

use anyhow::{anyhow, bail, Context};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";

/// Receipt photos are multi-megabyte and model latency is multi-second, so
/// the bound is generous. Failures surface to the caller; nothing retries.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// One role-tagged message in a completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(parts),
        }
    }
}

/// Message content: plain text, or mixed text and inline images.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Inlines image bytes as a data URL, the form the completions API
    /// accepts for vision input.
    pub fn image(mime_type: &str, bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{mime_type};base64,{encoded}"),
            },
        }
    }
}

/// The single capability the engines depend on: send a message list with an
/// output schema, get back a payload that conforms to it.
///
/// Errors are plain `anyhow` here; each engine maps them to its own uniform
/// category so provider error shapes never cross the operation boundary.
#[async_trait::async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        schema_name: &str,
        schema: Value,
    ) -> anyhow::Result<Value>;
}

/// Talks to the OpenAI chat completions API with structured output.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: OPENAI_BASE_URL.to_string(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Creates a client from `OPENAI_API_KEY` and optional `OPENAI_MODEL`.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY is not set")?;
        let model = std::env::var("OPENAI_MODEL").ok();
        Ok(Self::new(api_key, model))
    }
}

#[async_trait::async_trait]
impl Completer for OpenAiClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        schema_name: &str,
        schema: Value,
    ) -> anyhow::Result<Value> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "strict": true,
                    "schema": schema,
                }
            },
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Request to the completions API failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("Completions API returned status {status}: {error_body}");
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse the completions API response")?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("The completions API returned no choices"))?;

        serde_json::from_str(&content).context("Model output was not valid JSON")
    }
}

/// A canned completer, compiled even in the "production" build so the whole
/// program can run top-to-bottom without OpenAI.
#[derive(Default)]
pub struct MockCompleter {
    responses: HashMap<String, Value>,
}

impl MockCompleter {
    /// A mock with a canned answer for one schema name.
    pub fn with_response(schema_name: impl Into<String>, response: Value) -> Self {
        let mut responses = HashMap::new();
        responses.insert(schema_name.into(), response);
        Self { responses }
    }

    /// Adds another canned answer.
    pub fn and_response(mut self, schema_name: impl Into<String>, response: Value) -> Self {
        self.responses.insert(schema_name.into(), response);
        self
    }

    /// Plausible canned data for every engine, used by test mode.
    pub fn seeded() -> Self {
        Self::with_response(
            "receipt_extraction",
            json!({
                "items": [
                    {
                        "merchant": "Corner Market",
                        "date": "2025-10-21",
                        "category": "Groceries",
                        "item": "Sourdough loaf",
                        "cost": 6.50,
                    },
                    {
                        "merchant": "Corner Market",
                        "date": "2025-10-21",
                        "category": "Groceries",
                        "item": "Butter",
                        "cost": 4.25,
                    }
                ]
            }),
        )
        .and_response(
            "spending_insight",
            json!({
                "content": "Your biggest grocery spend this week was at Whole Foods Market.",
                "chart": null,
                "suggestedPrompts": ["How much did I spend on coffee?"],
            }),
        )
    }
}

#[async_trait::async_trait]
impl Completer for MockCompleter {
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        schema_name: &str,
        _schema: Value,
    ) -> anyhow::Result<Value> {
        self.responses
            .get(schema_name)
            .cloned()
            .ok_or_else(|| anyhow!("MockCompleter has no response for schema '{schema_name}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization_text() {
        let message = ChatMessage::system("hello");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, json!({ "role": "system", "content": "hello" }));
    }

    #[test]
    fn test_message_serialization_parts() {
        let message = ChatMessage::user_parts(vec![
            ContentPart::text("what is this receipt?"),
            ContentPart::image("image/png", &[1, 2, 3]),
        ]);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        let url = json["content"][1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_mock_completer_round_trip() {
        let mock = MockCompleter::with_response("x", json!({ "ok": true }));
        let value = mock.complete(vec![], "x", json!({})).await.unwrap();
        assert_eq!(value, json!({ "ok": true }));
        assert!(mock.complete(vec![], "y", json!({})).await.is_err());
    }
}
