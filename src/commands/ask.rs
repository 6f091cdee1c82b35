//! Ask and chat commands: spending Q&A with conversational continuity, and
//! the append-only chat log behind it.

use crate::api::{SheetStore, CHAT_HISTORY, TRANSACTIONS};
use crate::commands::Out;
use crate::error::{Error, Result};
use crate::llm::{answer_question, Completer, InsightResponse};
use crate::model::{ChatEntry, ChatRole};
use tracing::warn;

/// At most this many stored rows ride along as question context.
const CONTEXT_ROWS: usize = 100;

/// Answers a natural-language question about the user's spending.
///
/// Transaction context is best-effort: when the sheet cannot be read the
/// question still goes to the model without data, since generic spending
/// questions remain answerable. When `log` is set, the question and answer
/// are appended to the chat history afterwards; a logging failure degrades
/// to a warning rather than failing an already-produced answer.
///
/// # Errors
/// - `Error::LlmUnavailable` for any provider-side failure.
pub async fn ask(
    store: &mut dyn SheetStore,
    completer: &dyn Completer,
    question: &str,
    log: bool,
) -> Result<Out<InsightResponse>> {
    let range = format!("A2:E{}", 1 + CONTEXT_ROWS);
    let context = match store.read(TRANSACTIONS, &range).await {
        Ok(rows) => Some(rows),
        Err(e) => {
            warn!("Proceeding without transaction context: {e}");
            None
        }
    };
    let history = load_history(store).await;

    let response = answer_question(completer, context.as_deref(), &history, question).await?;

    if log {
        for entry in [
            ChatEntry::now(ChatRole::User, question),
            ChatEntry::now(ChatRole::Assistant, response.content.clone()),
        ] {
            if let Err(e) = chat_log(store, entry).await {
                warn!("Failed to record the conversation turn: {e}");
            }
        }
    }

    Ok(Out::new(response.content.clone(), response))
}

/// Appends one entry to the chat history.
///
/// # Errors
/// - `Error::TableNotFound` when the Chat History tab is missing.
/// - `Error::AppendFailed` for any other write failure.
pub async fn chat_log(store: &mut dyn SheetStore, entry: ChatEntry) -> Result<Out<()>> {
    store
        .append(CHAT_HISTORY, "A:C", &[entry.to_row()])
        .await
        .map_err(|e| match e {
            Error::TableNotFound(tab) => Error::TableNotFound(tab),
            other => Error::AppendFailed(anyhow::Error::new(other)),
        })?;
    Ok("Recorded the chat message".into())
}

/// Loads prior conversation turns, oldest first. Failures yield an empty
/// history rather than failing the question.
async fn load_history(store: &mut dyn SheetStore) -> Vec<ChatEntry> {
    match store.read(CHAT_HISTORY, "A2:C").await {
        Ok(rows) => rows.iter().filter_map(|r| ChatEntry::from_row(r)).collect(),
        Err(e) => {
            warn!("Proceeding without chat history: {e}");
            Vec::new()
        }
    }
}
