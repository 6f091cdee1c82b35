//! Chat history entries: one row per message in the Chat History tab.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who said a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    #[default]
    User,
    Assistant,
}

serde_plain::derive_display_from_serialize!(ChatRole);
serde_plain::derive_fromstr_from_deserialize!(ChatRole);

/// One message in the conversation, persisted append-only with no grouping
/// or merge semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatEntry {
    pub role: ChatRole,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    /// Creates an entry stamped with the current time.
    pub fn now(role: ChatRole, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// The `[Role, Message, Timestamp]` row appended to the sheet.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.role.to_string(),
            self.message.clone(),
            self.timestamp.to_rfc3339(),
        ]
    }

    /// Rebuilds an entry from a sheet row. Rows with an unknown role or a
    /// blank message are skipped by returning `None`.
    pub fn from_row(row: &[String]) -> Option<Self> {
        let role: ChatRole = row.first()?.trim().parse().ok()?;
        let message = row.get(1)?.trim();
        if message.is_empty() {
            return None;
        }
        let timestamp = row
            .get(2)
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();
        Some(Self {
            role,
            message: message.to_string(),
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(ChatRole::User.to_string(), "user");
        assert_eq!("assistant".parse::<ChatRole>().unwrap(), ChatRole::Assistant);
        assert!("narrator".parse::<ChatRole>().is_err());
    }

    #[test]
    fn test_entry_row_round_trip() {
        let entry = ChatEntry::now(ChatRole::Assistant, "You spent $42 on coffee.");
        let parsed = ChatEntry::from_row(&entry.to_row()).unwrap();
        assert_eq!(parsed.role, entry.role);
        assert_eq!(parsed.message, entry.message);
    }

    #[test]
    fn test_from_row_skips_unknown_role() {
        let row = vec!["narrator".to_string(), "hi".to_string(), String::new()];
        assert!(ChatEntry::from_row(&row).is_none());
    }

    #[test]
    fn test_from_row_skips_blank_message() {
        let row = vec!["user".to_string(), "  ".to_string(), String::new()];
        assert!(ChatEntry::from_row(&row).is_none());
    }
}
