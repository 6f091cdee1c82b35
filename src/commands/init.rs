//! Init command: create the data directory and bring the spreadsheet to its
//! canonical shape.

use crate::api::{self, Mode, SheetStore};
use crate::commands::Out;
use crate::error::{Error, Result};
use crate::sheet_format;
use crate::Config;
use std::path::Path;

/// Creates the data directory and its config, then ensures both sheet tabs
/// exist and are formatted.
///
/// # Arguments
/// - `spend_home` - The directory that will be the root of the data
///   directory, e.g. `$HOME/spendsheet`.
/// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON. This
///   is copied to its default location in the data directory.
/// - `sheet_url` - The URL of the Google Sheet that will hold the expense
///   data, e.g.
///   https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
///
/// # Errors
/// - `Error::InvalidSheetUrl` when the URL does not look like a Google Sheet.
/// - `Error::InitializationFailed` when the tabs cannot be created or
///   formatted; the caller must not treat the spreadsheet as usable, since
///   the typed append path depends on the column formats.
pub async fn init(
    spend_home: &Path,
    secret_file: &Path,
    sheet_url: &str,
    mode: Mode,
) -> Result<Out<()>> {
    let config = Config::create(spend_home, secret_file, sheet_url).await?;
    let mut store = api::store(&config, mode)
        .await
        .map_err(as_init_failed)?;
    initialize_store(store.as_mut()).await?;
    Ok("Initialized the data directory and formatted the spreadsheet".into())
}

/// Ensures both tabs exist with headers, formats, borders, frozen header
/// rows, and column widths. Safe to re-run; re-application never alters cell
/// values.
pub async fn initialize_store(store: &mut dyn SheetStore) -> Result<()> {
    sheet_format::ensure_transactions_layout(store)
        .await
        .map_err(as_init_failed)?;
    sheet_format::ensure_chat_layout(store)
        .await
        .map_err(as_init_failed)?;
    Ok(())
}

fn as_init_failed(e: Error) -> Error {
    Error::InitializationFailed(anyhow::Error::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{TestStore, CHAT_HISTORY, TRANSACTIONS};

    #[tokio::test]
    async fn test_initialize_store_creates_both_tabs() {
        let mut store = TestStore::empty();
        initialize_store(&mut store).await.unwrap();
        assert_eq!(
            store.rows(TRANSACTIONS)[0],
            vec!["Merchant", "Date", "Category", "Item", "Cost"]
        );
        assert_eq!(store.rows(CHAT_HISTORY)[0], vec!["Role", "Message", "Timestamp"]);
    }

    #[tokio::test]
    async fn test_initialize_store_preserves_existing_data() {
        let mut store = TestStore::default();
        let data_rows = store.rows(TRANSACTIONS)[1..].to_vec();
        initialize_store(&mut store).await.unwrap();
        assert_eq!(&store.rows(TRANSACTIONS)[1..], data_rows.as_slice());
    }
}
