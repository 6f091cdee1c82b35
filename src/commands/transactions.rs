//! Transactions command: read stored rows back and reconstruct the
//! transaction groupings from the merged-cell layout.

use crate::api::{SheetStore, TRANSACTIONS};
use crate::commands::Out;
use crate::error::{Error, Result};
use crate::model::{parse_transactions, TransactionGroup};

/// Reads the ordered transaction list from the sheet.
///
/// The reader tolerates data edited directly in the sheet between sessions,
/// as long as the convention holds that a blank merchant/date cell continues
/// the previous transaction.
///
/// # Errors
/// - `Error::TableNotFound` when the Transactions tab is missing.
/// - `Error::ReadFailed` for any other read failure.
pub async fn transactions(store: &mut dyn SheetStore) -> Result<Out<Vec<TransactionGroup>>> {
    let rows = store.read(TRANSACTIONS, "A2:E").await.map_err(|e| match e {
        Error::TableNotFound(tab) => Error::TableNotFound(tab),
        other => Error::ReadFailed(anyhow::Error::new(other)),
    })?;
    let groups = parse_transactions(&rows);
    let message = format!("Found {} transaction(s)", groups.len());
    Ok(Out::new(message, groups))
}
