//! The completion-API seam and the two engines built on it: receipt
//! extraction and spending Q&A.
//!
//! The provider is the one true dynamic-typing boundary in this program, so
//! it sits behind a single capability, `complete(messages, schema)`, whose
//! output is schema-constrained before anything downstream sees it.

mod client;
mod extract;
mod insights;
mod prompts;

pub use client::{ChatMessage, Completer, ContentPart, MessageContent, MockCompleter, OpenAiClient};
pub use extract::{extract_line_items, ImageInput};
pub use insights::{
    answer_question, transactions_context, ChartKind, ChartPoint, ChartSpec, InsightResponse,
};
