//! The spreadsheet store seam: a small trait over the range-addressed
//! read/append/format API, with a Google Sheets implementation and an
//! in-memory implementation for tests and test mode.

mod google;
mod oauth;
mod test_store;

use crate::config::Config;
use crate::error::Result;
use serde_json::json;
use url::Url;

pub use google::GoogleSheetStore;
pub(crate) use oauth::TokenProvider;
pub use test_store::TestStore;

/// The tab that holds transaction rows.
pub const TRANSACTIONS: &str = "Transactions";

/// The tab that holds the chat conversation log.
pub const CHAT_HISTORY: &str = "Chat History";

/// Selects the real Google Sheets backend or the in-memory test backend.
///
/// When `SPENDSHEET_IN_TEST_MODE` is set and non-empty the whole program runs
/// against in-memory data, top-to-bottom, without touching Google.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Google,
    Test,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var("SPENDSHEET_IN_TEST_MODE") {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Range-addressed operations against one spreadsheet.
///
/// Ranges are given without the tab prefix (`A2:E`, `A1:C1`); implementations
/// qualify them with the tab name. All row data is strings; the store types
/// date-like and number-like values itself on write.
#[async_trait::async_trait]
pub trait SheetStore: Send {
    /// Reads raw cell values. Fails with `Error::TableNotFound` when the tab
    /// does not exist; other transport failures are `Error::StoreUnavailable`.
    async fn read(&mut self, tab: &str, range: &str) -> Result<Vec<Vec<String>>>;

    /// Appends rows after existing data, with user-entered value
    /// interpretation so date and number strings become typed cells.
    async fn append(&mut self, tab: &str, range: &str, rows: &[Vec<String>]) -> Result<()>;

    /// Overwrites a specific range (used for the fixed header row).
    async fn update_values(&mut self, tab: &str, range: &str, rows: &[Vec<String>]) -> Result<()>;

    /// Looks up a tab's numeric sheet id, or `None` when absent.
    async fn sheet_id(&mut self, tab: &str) -> Result<Option<i64>>;

    /// Returns the tab's sheet id, creating the tab when absent. Idempotent:
    /// an existing tab is returned untouched.
    async fn get_or_create_sheet(&mut self, tab: &str) -> Result<i64>;

    /// Applies a list of structural requests (formats, borders, merges,
    /// frozen rows) as one batch. From the caller's perspective either all
    /// intended effects land or the call fails.
    async fn batch_update(&mut self, requests: Vec<serde_json::Value>) -> Result<()>;

    /// Merges one rectangular region. Used only to span Merchant or Date
    /// cells across a multi-row transaction.
    async fn merge_cells(
        &mut self,
        sheet_id: i64,
        row_start: i64,
        row_end: i64,
        col_start: i64,
        col_end: i64,
    ) -> Result<()> {
        self.batch_update(vec![merge_request(
            sheet_id, row_start, row_end, col_start, col_end,
        )])
        .await
    }
}

/// Builds a `mergeCells` request for a rectangular region. Row and column
/// indexes are zero-based, end-exclusive, matching the store's grid-range
/// addressing.
pub(crate) fn merge_request(
    sheet_id: i64,
    row_start: i64,
    row_end: i64,
    col_start: i64,
    col_end: i64,
) -> serde_json::Value {
    json!({
        "mergeCells": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": row_start,
                "endRowIndex": row_end,
                "startColumnIndex": col_start,
                "endColumnIndex": col_end,
            },
            "mergeType": "MERGE_ALL",
        }
    })
}

/// Creates a store for the given mode.
pub async fn store(config: &Config, mode: Mode) -> Result<Box<dyn SheetStore>> {
    match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            Ok(Box::new(GoogleSheetStore::new(
                config.spreadsheet_id().to_string(),
                token_provider,
            )))
        }
        Mode::Test => Ok(Box::new(TestStore::default())),
    }
}

/// Extracts the spreadsheet id from a Google Sheets URL.
///
/// Returns `None` (not an error) when the URL does not match the
/// `docs.google.com/spreadsheets/d/<ID>` pattern; callers treat that as a
/// client input problem, not a server failure.
pub fn resolve_spreadsheet_id(sheet_url: &str) -> Option<String> {
    let url = Url::parse(sheet_url).ok()?;
    if url.host_str() != Some("docs.google.com") {
        return None;
    }
    let mut segments = url.path_segments()?;
    if segments.next() != Some("spreadsheets") || segments.next() != Some("d") {
        return None;
    }
    match segments.next() {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_spreadsheet_id() {
        let url = "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL/edit";
        assert_eq!(
            resolve_spreadsheet_id(url).as_deref(),
            Some("7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL")
        );
    }

    #[test]
    fn test_resolve_spreadsheet_id_without_suffix() {
        let url = "https://docs.google.com/spreadsheets/d/ABC123";
        assert_eq!(resolve_spreadsheet_id(url).as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_resolve_spreadsheet_id_with_query() {
        let url = "https://docs.google.com/spreadsheets/d/ABC123?usp=sharing";
        assert_eq!(resolve_spreadsheet_id(url).as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_resolve_rejects_other_urls() {
        assert_eq!(resolve_spreadsheet_id("https://example.com/spreadsheets/d/ABC"), None);
        assert_eq!(resolve_spreadsheet_id("https://docs.google.com/document/d/ABC"), None);
        assert_eq!(resolve_spreadsheet_id("not a url"), None);
    }

    #[test]
    fn test_mode_from_env_defaults_to_google() {
        // The variable is unset in the test environment.
        assert_eq!(Mode::from_env(), Mode::Google);
    }
}
