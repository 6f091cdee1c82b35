//! The insight engine: natural-language Q&A over the transaction history,
//! with optional chart-ready output.

use crate::error::{Error, Result};
use crate::llm::client::{ChatMessage, Completer};
use crate::llm::prompts::INSIGHT_PROMPT;
use crate::model::ChatEntry;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Only this many prior turns ride along for conversational continuity.
const HISTORY_WINDOW: usize = 10;

/// Answer shown when the model returns empty content on an otherwise
/// successful call.
const DEFAULT_CONTENT: &str =
    "I wasn't able to put together an answer for that. Could you try rephrasing the question?";

/// A structured answer: markdown text, an optional chart, and optional
/// follow-up prompts, passed through to the caller as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
    #[serde(
        default,
        rename = "suggestedPrompts",
        skip_serializing_if = "Option::is_none"
    )]
    pub suggested_prompts: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub name: String,
    pub value: f64,
}

/// Answers a question about the user's spending.
///
/// `context_rows` are raw stored rows (already bounded by the caller); when
/// the caller could not read them the question is still answered, just
/// without data. All provider and validation failures surface uniformly as
/// `Error::LlmUnavailable`.
pub async fn answer_question(
    completer: &dyn Completer,
    context_rows: Option<&[Vec<String>]>,
    history: &[ChatEntry],
    question: &str,
) -> Result<InsightResponse> {
    let mut messages = vec![ChatMessage::system(INSIGHT_PROMPT)];
    if let Some(rows) = context_rows {
        messages.push(ChatMessage::user(transactions_context(rows)));
    }
    for entry in history.iter().rev().take(HISTORY_WINDOW).rev() {
        let message = match entry.role {
            crate::model::ChatRole::User => ChatMessage::user(entry.message.clone()),
            crate::model::ChatRole::Assistant => ChatMessage::assistant(entry.message.clone()),
        };
        messages.push(message);
    }
    messages.push(ChatMessage::user(question));

    let payload = completer
        .complete(messages, "spending_insight", insight_schema())
        .await
        .map_err(Error::LlmUnavailable)?;
    let mut response: InsightResponse = serde_json::from_value(payload)
        .map_err(|e| Error::LlmUnavailable(anyhow!(e).context("Model output did not match the insight schema")))?;

    if response.content.trim().is_empty() {
        response.content = DEFAULT_CONTENT.to_string();
    }
    Ok(response)
}

/// Renders stored rows as a compact table for the context turn.
pub fn transactions_context(rows: &[Vec<String>]) -> String {
    let mut context = String::from(
        "Here are the user's recorded transactions (Merchant | Date | Category | Item | Cost):\n",
    );
    for row in rows {
        context.push_str(&row.join(" | "));
        context.push('\n');
    }
    context
}

fn insight_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": { "type": "string" },
            "chart": {
                "type": ["object", "null"],
                "properties": {
                    "type": { "type": "string", "enum": ["bar", "line"] },
                    "data": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "value": { "type": "number" },
                            },
                            "required": ["name", "value"],
                            "additionalProperties": false,
                        }
                    },
                },
                "required": ["type", "data"],
                "additionalProperties": false,
            },
            "suggestedPrompts": {
                "type": ["array", "null"],
                "items": { "type": "string" },
            },
        },
        "required": ["content", "chart", "suggestedPrompts"],
        "additionalProperties": false,
    })
}
