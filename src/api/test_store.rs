//! Implements the `SheetStore` trait using in-memory data for testing.
//!
//! Note: this is compiled even in the "production" version of this app so
//! that we can run the whole program, top-to-bottom, without touching Google
//! Sheets or OpenAI.

use crate::api::{SheetStore, CHAT_HISTORY, TRANSACTIONS};
use crate::error::{Error, Result};
use anyhow::{anyhow, Context};
use std::collections::HashMap;
use std::io::Cursor;

/// One recorded cell merge: `(sheet_id, row_start, row_end, col_start,
/// col_end)`, zero-based, end-exclusive.
pub type RecordedMerge = (i64, i64, i64, i64, i64);

/// An in-memory `SheetStore`. Holds any tabs and rows, records every batch
/// request and merge it receives, and by default is seeded with some
/// existing data.
pub struct TestStore {
    tabs: Vec<String>,
    data: HashMap<String, Vec<Vec<String>>>,
    merges: Vec<RecordedMerge>,
    requests: Vec<serde_json::Value>,
}

impl TestStore {
    /// Creates a store with the given tabs. The map key is the tab name and
    /// the value is the rows of the tab.
    pub fn new(data: HashMap<String, Vec<Vec<String>>>) -> Self {
        // Sorted so that tab ids are deterministic regardless of map order.
        let mut tabs: Vec<String> = data.keys().cloned().collect();
        tabs.sort();
        Self {
            tabs,
            data,
            merges: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// A store with no tabs at all, as a fresh spreadsheet would have.
    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// The current rows of a tab, for assertions.
    pub fn rows(&self, tab: &str) -> &[Vec<String>] {
        self.data.get(tab).map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// Every merge recorded so far.
    pub fn merges(&self) -> &[RecordedMerge] {
        &self.merges
    }

    /// Every batch request recorded so far.
    pub fn requests(&self) -> &[serde_json::Value] {
        &self.requests
    }

    fn tab_data(&mut self, tab: &str) -> Result<&mut Vec<Vec<String>>> {
        self.data
            .get_mut(tab)
            .ok_or_else(|| Error::TableNotFound(tab.to_string()))
    }
}

impl Default for TestStore {
    /// Loads seed data from this module.
    fn default() -> Self {
        Self::new(default_data())
    }
}

#[async_trait::async_trait]
impl SheetStore for TestStore {
    async fn read(&mut self, tab: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let bounds = RangeBounds::parse(range)?;
        let rows = self.tab_data(tab)?;
        let result = rows
            .iter()
            .enumerate()
            .filter(|(ix, _)| bounds.contains_row(*ix))
            .map(|(_, row)| bounds.slice_columns(row))
            .collect();
        Ok(result)
    }

    async fn append(&mut self, tab: &str, _range: &str, rows: &[Vec<String>]) -> Result<()> {
        self.tab_data(tab)?.extend(rows.iter().cloned());
        Ok(())
    }

    async fn update_values(&mut self, tab: &str, range: &str, rows: &[Vec<String>]) -> Result<()> {
        let bounds = RangeBounds::parse(range)?;
        let data = self.tab_data(tab)?;
        for (row_offset, new_row) in rows.iter().enumerate() {
            let row_ix = bounds.row_start + row_offset;
            while data.len() <= row_ix {
                data.push(Vec::new());
            }
            let row = &mut data[row_ix];
            for (col_offset, value) in new_row.iter().enumerate() {
                let col_ix = bounds.col_start + col_offset;
                while row.len() <= col_ix {
                    row.push(String::new());
                }
                row[col_ix] = value.clone();
            }
        }
        Ok(())
    }

    async fn sheet_id(&mut self, tab: &str) -> Result<Option<i64>> {
        Ok(self.tabs.iter().position(|t| t == tab).map(|ix| ix as i64))
    }

    async fn get_or_create_sheet(&mut self, tab: &str) -> Result<i64> {
        if let Some(id) = self.sheet_id(tab).await? {
            return Ok(id);
        }
        self.tabs.push(tab.to_string());
        self.data.insert(tab.to_string(), Vec::new());
        Ok((self.tabs.len() - 1) as i64)
    }

    async fn batch_update(&mut self, requests: Vec<serde_json::Value>) -> Result<()> {
        for request in &requests {
            if let Some(range) = request.pointer("/mergeCells/range") {
                self.merges.push((
                    range.get("sheetId").and_then(|v| v.as_i64()).unwrap_or(0),
                    range.get("startRowIndex").and_then(|v| v.as_i64()).unwrap_or(0),
                    range.get("endRowIndex").and_then(|v| v.as_i64()).unwrap_or(0),
                    range.get("startColumnIndex").and_then(|v| v.as_i64()).unwrap_or(0),
                    range.get("endColumnIndex").and_then(|v| v.as_i64()).unwrap_or(0),
                ));
            }
        }
        self.requests.extend(requests);
        Ok(())
    }
}

/// Zero-based, inclusive-start bounds parsed from an `A1`-style range such
/// as `A2:E`, `A1:E1`, or `A2:E101`.
struct RangeBounds {
    row_start: usize,
    row_end: Option<usize>,
    col_start: usize,
    col_end: usize,
}

impl RangeBounds {
    fn parse(range: &str) -> Result<Self> {
        let (start, end) = range
            .split_once(':')
            .context("Range must have a start and end")
            .map_err(Error::StoreUnavailable)?;
        let (col_start, row_start) = split_cell(start)?;
        let (col_end, row_end) = split_cell(end)?;
        Ok(Self {
            row_start: row_start.map(|r| r - 1).unwrap_or(0),
            row_end: row_end.map(|r| r - 1),
            col_start: col_to_index(&col_start)?,
            col_end: col_to_index(&col_end)?,
        })
    }

    fn contains_row(&self, ix: usize) -> bool {
        ix >= self.row_start && self.row_end.map_or(true, |end| ix <= end)
    }

    fn slice_columns(&self, row: &[String]) -> Vec<String> {
        (self.col_start..=self.col_end)
            .map(|ix| row.get(ix).cloned().unwrap_or_default())
            .collect()
    }
}

fn split_cell(cell: &str) -> Result<(String, Option<usize>)> {
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits: String = cell.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
    let row = if digits.is_empty() {
        None
    } else {
        Some(
            digits
                .parse::<usize>()
                .map_err(|e| Error::StoreUnavailable(anyhow!(e)))?,
        )
    };
    Ok((letters, row))
}

fn col_to_index(letters: &str) -> Result<usize> {
    if letters.is_empty() {
        return Err(Error::StoreUnavailable(anyhow!("Range is missing a column letter")));
    }
    let mut index = 0usize;
    for c in letters.chars() {
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Ok(index - 1)
}

/// Provides the seed data for the default store.
fn default_data() -> HashMap<String, Vec<Vec<String>>> {
    let mut map = HashMap::new();
    map.insert(TRANSACTIONS.to_string(), load_csv(TRANSACTION_DATA).unwrap());
    map.insert(CHAT_HISTORY.to_string(), load_csv(CHAT_DATA).unwrap());
    map
}

/// Loads rows from a CSV-formatted string.
fn load_csv(csv_data: &str) -> anyhow::Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false) // headers are part of the sheet data
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// Seed transaction data, in the merged-cell layout the append path writes:
/// merchant and date populated only on the first row of each span.
const TRANSACTION_DATA: &str = r##"Merchant,Date,Category,Item,Cost
Whole Foods Market,10/20/2025,Groceries,Organic bananas,$2.49
,,Groceries,Oat milk,$4.99
,,Household,Dish soap,$3.79
Starbucks,10/20/2025,Coffee Shops,Latte,$6.75
Shell,10/19/2025,Gas & Fuel,Fuel,$52.30
Trader Joe's,10/18/2025,Groceries,Frozen dumplings,$5.49
,,Groceries,Sparkling water,$3.99
"##;

/// Seed chat data.
const CHAT_DATA: &str = r##"Role,Message,Timestamp
user,How much did I spend on groceries this month?,2025-10-21T09:15:30Z
assistant,"You spent $20.75 on groceries so far, mostly at Whole Foods Market.",2025-10-21T09:15:33Z
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_skips_header_for_a2_range() {
        let mut store = TestStore::default();
        let rows = store.read(TRANSACTIONS, "A2:E").await.unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0][0], "Whole Foods Market");
    }

    #[tokio::test]
    async fn test_read_bounded_range() {
        let mut store = TestStore::default();
        let rows = store.read(TRANSACTIONS, "A2:E3").await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_read_missing_tab() {
        let mut store = TestStore::empty();
        let err = store.read(TRANSACTIONS, "A2:E").await.unwrap_err();
        assert!(matches!(err, Error::TableNotFound(_)));
    }

    #[tokio::test]
    async fn test_append_adds_rows() {
        let mut store = TestStore::default();
        let before = store.rows(TRANSACTIONS).len();
        store
            .append(TRANSACTIONS, "A:E", &[vec!["Acme".to_string()]])
            .await
            .unwrap();
        assert_eq!(store.rows(TRANSACTIONS).len(), before + 1);
    }

    #[tokio::test]
    async fn test_update_values_overwrites_header() {
        let mut store = TestStore::default();
        store
            .update_values(
                TRANSACTIONS,
                "A1:E1",
                &[vec!["X".to_string(), "Y".to_string()]],
            )
            .await
            .unwrap();
        assert_eq!(store.rows(TRANSACTIONS)[0][0], "X");
        assert_eq!(store.rows(TRANSACTIONS)[0][1], "Y");
        // Columns beyond the written range are untouched.
        assert_eq!(store.rows(TRANSACTIONS)[0][2], "Category");
    }

    #[tokio::test]
    async fn test_get_or_create_sheet_is_idempotent() {
        let mut store = TestStore::empty();
        let first = store.get_or_create_sheet("Budget").await.unwrap();
        let second = store.get_or_create_sheet("Budget").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.rows("Budget").len(), 0);
    }

    #[tokio::test]
    async fn test_merge_cells_is_recorded() {
        let mut store = TestStore::default();
        store.merge_cells(0, 1, 4, 0, 1).await.unwrap();
        assert_eq!(store.merges(), &[(0, 1, 4, 0, 1)]);
    }

    #[test]
    fn test_col_to_index() {
        assert_eq!(col_to_index("A").unwrap(), 0);
        assert_eq!(col_to_index("E").unwrap(), 4);
        assert_eq!(col_to_index("AA").unwrap(), 26);
    }
}
