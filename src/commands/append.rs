//! Append command: reconcile extracted line items against the sheet and
//! write them as merged-cell transaction spans.

use crate::api::{SheetStore, TRANSACTIONS};
use crate::commands::Out;
use crate::error::{Error, Result};
use crate::model::{
    build_rows, existing_totals, find_duplicate, group_items, parse_transactions, LineItem,
};
use serde::Serialize;
use tracing::{debug, warn};

/// What an append wrote, plus any non-fatal presentation problems.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AppendSummary {
    pub rows_added: usize,
    pub transactions_added: usize,
    /// Set when the rows were written but the visual cell merges could not
    /// be applied. The data is intact either way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_warning: Option<String>,
}

/// Appends line items to the Transactions tab.
///
/// Duplicate detection runs fully before any write: existing transactions
/// are re-read and re-derived from the sheet on every call (never cached;
/// staleness would widen the concurrent-writer race), and a single duplicate
/// match aborts the whole call before anything is written, including groups
/// that were not themselves duplicates.
///
/// # Errors
/// - `Error::TransactionsTableNotFound` when the tab is missing; run init.
/// - `Error::DuplicateDetected` when any group matches an existing
///   transaction within tolerance; the sheet is untouched.
/// - `Error::AppendFailed` for any other read or write failure. The batched
///   row write is all-or-nothing; a merge failure after a successful write
///   is reported in the summary, not as an error.
pub async fn append(store: &mut dyn SheetStore, items: Vec<LineItem>) -> Result<Out<AppendSummary>> {
    if items.is_empty() {
        return Err(Error::NoInputProvided);
    }

    // Read the current sheet state. This doubles as the existence check.
    let existing_rows = store.read(TRANSACTIONS, "A2:E").await.map_err(|e| match e {
        Error::TableNotFound(_) => Error::TransactionsTableNotFound,
        other => Error::AppendFailed(anyhow::Error::new(other)),
    })?;

    let groups = group_items(items);
    let existing = existing_totals(&parse_transactions(&existing_rows));
    if let Some(duplicate) = find_duplicate(&groups, &existing) {
        return Err(Error::DuplicateDetected {
            merchant: duplicate.merchant.clone(),
            date: duplicate.date.to_string(),
        });
    }

    let (rows, spans) = build_rows(&groups);
    store
        .append(TRANSACTIONS, "A:E", &rows)
        .await
        .map_err(|e| Error::AppendFailed(anyhow::Error::new(e)))?;
    debug!(
        "Appended {} row(s) across {} transaction(s)",
        rows.len(),
        groups.len()
    );

    // Merge Merchant and Date cells over each multi-row span. This is a
    // visual enhancement only: a failure here must not fail the append, the
    // rows are already safely written.
    let mut summary = AppendSummary {
        rows_added: rows.len(),
        transactions_added: groups.len(),
        merge_warning: None,
    };
    // The first appended row sits just past the header plus existing rows
    // (zero-based grid index).
    let first_row_index = 1 + existing_rows.len();
    if let Err(e) = apply_merges(store, first_row_index, &spans).await {
        warn!("Rows were written but cell merges failed: {e}");
        summary.merge_warning = Some(format!("Cell merges could not be applied: {e}"));
    }

    let message = format!(
        "Added {} row(s) across {} transaction(s)",
        summary.rows_added, summary.transactions_added
    );
    Ok(Out::new(message, summary))
}

async fn apply_merges(
    store: &mut dyn SheetStore,
    first_row_index: usize,
    spans: &[crate::model::GroupSpan],
) -> Result<()> {
    if !spans.iter().any(|s| s.len > 1) {
        return Ok(());
    }
    let sheet_id = store
        .sheet_id(TRANSACTIONS)
        .await?
        .ok_or_else(|| Error::TableNotFound(TRANSACTIONS.to_string()))?;
    for span in spans.iter().filter(|s| s.len > 1) {
        let start = (first_row_index + span.start) as i64;
        let end = start + span.len as i64;
        // One merge per column: Merchant (A), then Date (B).
        store.merge_cells(sheet_id, start, end, 0, 1).await?;
        store.merge_cells(sheet_id, start, end, 1, 2).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestStore;
    use crate::model::Amount;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn item(merchant: &str, date: &str, desc: &str, cost: &str) -> LineItem {
        LineItem {
            merchant: merchant.to_string(),
            date: NaiveDate::from_str(date).unwrap(),
            category: "Misc".to_string(),
            item: desc.to_string(),
            cost: Amount::from_str(cost).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_append_writes_rows_and_merges() {
        let mut store = TestStore::default();
        let before = store.rows(TRANSACTIONS).len();
        let out = append(
            &mut store,
            vec![
                item("Acme", "2024-03-01", "Milk", "3.00"),
                item("Acme", "2024-03-01", "Eggs", "4.50"),
            ],
        )
        .await
        .unwrap();

        let summary = out.structure().unwrap();
        assert_eq!(summary.rows_added, 2);
        assert_eq!(summary.transactions_added, 1);
        assert!(summary.merge_warning.is_none());
        assert_eq!(store.rows(TRANSACTIONS).len(), before + 2);

        // Merchant and Date merges over the two appended rows.
        let sheet_id = store.sheet_id(TRANSACTIONS).await.unwrap().unwrap();
        let start = before as i64;
        assert_eq!(store.merges().len(), 2);
        assert_eq!(store.merges()[0], (sheet_id, start, start + 2, 0, 1));
        assert_eq!(store.merges()[1], (sheet_id, start, start + 2, 1, 2));
    }

    #[tokio::test]
    async fn test_append_single_row_group_needs_no_merge() {
        let mut store = TestStore::default();
        append(&mut store, vec![item("Acme", "2024-03-01", "Milk", "3.00")])
            .await
            .unwrap();
        assert!(store.merges().is_empty());
    }

    #[tokio::test]
    async fn test_append_missing_tab_is_fatal() {
        let mut store = TestStore::empty();
        let err = append(&mut store, vec![item("Acme", "2024-03-01", "Milk", "3.00")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransactionsTableNotFound));
    }

    #[tokio::test]
    async fn test_append_duplicate_is_rejected() {
        let mut store = TestStore::default();
        // The seed data has Starbucks on 10/20/2025 for $6.75.
        let err = append(
            &mut store,
            vec![item("starbucks", "2025-10-20", "Latte", "6.75")],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateDetected { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_aborts_all_groups() {
        let mut store = TestStore::default();
        let before = store.rows(TRANSACTIONS).to_vec();
        let err = append(
            &mut store,
            vec![
                // Duplicate of the seeded Starbucks transaction.
                item("Starbucks", "2025-10-20", "Latte", "6.75"),
                // A novel transaction that must also not be written.
                item("New Vendor", "2025-10-22", "Widget", "12.00"),
            ],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateDetected { .. }));
        assert_eq!(store.rows(TRANSACTIONS), before.as_slice());
        assert!(store.merges().is_empty());
    }

    #[tokio::test]
    async fn test_append_outside_tolerance_is_accepted() {
        let mut store = TestStore::default();
        // Seeded Starbucks total is $6.75; $8.00 is outside max(5%, $1).
        append(
            &mut store,
            vec![item("Starbucks", "2025-10-20", "Another latte", "8.00")],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_append_empty_items_is_input_error() {
        let mut store = TestStore::default();
        let err = append(&mut store, Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::NoInputProvided));
    }

    #[tokio::test]
    async fn test_round_trip_through_reader() {
        let mut store = TestStore::empty();
        crate::commands::initialize_store(&mut store).await.unwrap();
        let items = vec![
            item("Acme", "2024-03-01", "Milk", "3.00"),
            item("Acme", "2024-03-01", "Eggs", "4.50"),
            item("Bazaar", "2024-03-02", "Soap", "2.00"),
        ];
        append(&mut store, items.clone()).await.unwrap();

        let rows = store.read(TRANSACTIONS, "A2:E").await.unwrap();
        let parsed = parse_transactions(&rows);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].items.len(), 2);
        assert_eq!(parsed[0].merchant, "Acme");
        assert_eq!(parsed[0].items[1].item, "Eggs");
        assert_eq!(parsed[1].merchant, "Bazaar");
    }
}
