//! Transactions: groups of line items sharing a merchant and date, and the
//! logic that maps them to and from the sheet's merged-cell row layout.
//!
//! On the sheet a transaction is a contiguous row span in which only the
//! first row carries the merchant and date; the remaining rows leave those
//! cells blank and a cell merge spans them visually. Reconstruction therefore
//! carries the last non-empty merchant/date forward over blank cells.

use crate::model::{Amount, LineItem};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Relative tolerance for duplicate detection: 5%.
const DUPLICATE_RATIO: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Absolute floor for duplicate detection: one currency unit.
const DUPLICATE_FLOOR: Decimal = Decimal::ONE;

/// A group of line items sharing a merchant and date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TransactionGroup {
    pub merchant: String,
    pub date: NaiveDate,
    pub items: Vec<LineItem>,
}

impl TransactionGroup {
    fn new(merchant: String, date: NaiveDate) -> Self {
        Self {
            merchant,
            date,
            items: Vec::new(),
        }
    }

    /// The summed cost of all items in the group.
    pub fn total(&self) -> Amount {
        Amount::new(self.items.iter().map(|i| i.cost.value()).sum())
    }

    /// The duplicate-detection key: lowercased merchant plus date.
    pub fn key(&self) -> (String, NaiveDate) {
        (self.merchant.to_lowercase(), self.date)
    }
}

/// Parses a date as stored on the sheet or produced by extraction.
///
/// Exactly two forms are supported: `YYYY-MM-DD` and `M/D/YYYY`.
pub fn normalize_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

/// Formats a date the way the append path writes it: `M/D/YYYY`, which the
/// sheet's user-entered value interpretation recognizes as a real date. Raw
/// `YYYY-MM-DD` would land as plain text and break the date column format.
pub fn sheet_date(date: NaiveDate) -> String {
    use chrono::Datelike;
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

/// Partitions line items into transactions keyed by exact `(merchant, date)`,
/// preserving first-seen order of distinct keys and within-group insertion
/// order.
pub fn group_items(items: Vec<LineItem>) -> Vec<TransactionGroup> {
    let mut groups: Vec<TransactionGroup> = Vec::new();
    for item in items {
        let position = groups
            .iter()
            .position(|g| g.merchant == item.merchant && g.date == item.date);
        let group = match position {
            Some(ix) => &mut groups[ix],
            None => {
                groups.push(TransactionGroup::new(item.merchant.clone(), item.date));
                groups.last_mut().unwrap()
            }
        };
        group.items.push(item);
    }
    groups
}

/// Reconstructs transactions from raw sheet rows (header row excluded).
///
/// A fold with two carry-forward cells: a non-empty merchant starts a new
/// transaction, a non-empty date refreshes the date, and each updates
/// independently. A row contributes a line item only when merchant, date,
/// and item description are all non-empty after substitution; anything else
/// is skipped without error so hand-edited sheets with stray blank rows
/// still parse.
pub fn parse_transactions(rows: &[Vec<String>]) -> Vec<TransactionGroup> {
    let mut transactions: Vec<TransactionGroup> = Vec::new();
    let mut merchant = String::new();
    let mut date_cell = String::new();

    for row in rows {
        let merchant_cell = cell(row, 0);
        let starts_new = !merchant_cell.is_empty();
        if starts_new {
            merchant = merchant_cell.to_string();
        }
        let date_value = cell(row, 1);
        if !date_value.is_empty() {
            date_cell = date_value.to_string();
        }

        let description = cell(row, 3);
        if merchant.is_empty() || date_cell.is_empty() || description.is_empty() {
            continue;
        }
        let Some(date) = normalize_date(&date_cell) else {
            continue;
        };

        let continues_last = !starts_new
            && transactions
                .last()
                .is_some_and(|t| t.merchant == merchant && t.date == date);
        if !continues_last {
            transactions.push(TransactionGroup::new(merchant.clone(), date));
        }
        transactions.last_mut().unwrap().items.push(LineItem {
            merchant: merchant.clone(),
            date,
            category: cell(row, 2).to_string(),
            item: description.to_string(),
            cost: Amount::parse_lenient(cell(row, 4)),
        });
    }
    transactions
}

/// Sums existing transaction totals per duplicate-detection key.
pub fn existing_totals(groups: &[TransactionGroup]) -> HashMap<(String, NaiveDate), Decimal> {
    let mut totals: HashMap<(String, NaiveDate), Decimal> = HashMap::new();
    for group in groups {
        *totals.entry(group.key()).or_default() += group.total().value();
    }
    totals
}

/// Finds the first new group that duplicates an existing transaction.
///
/// A match requires the same lowercased merchant, the same normalized date,
/// and a total within `max(new_total * 5%, $1.00)` of the existing total.
/// Known-imperfect heuristic: re-extracting the same receipt with a
/// sufficiently different total slips past it. Do not tighten the threshold
/// without new product direction.
pub fn find_duplicate<'a>(
    new_groups: &'a [TransactionGroup],
    existing: &HashMap<(String, NaiveDate), Decimal>,
) -> Option<&'a TransactionGroup> {
    new_groups.iter().find(|group| {
        existing.get(&group.key()).is_some_and(|&existing_total| {
            group
                .total()
                .within_tolerance_of(Amount::new(existing_total), DUPLICATE_RATIO, DUPLICATE_FLOOR)
        })
    })
}

/// The row span one group occupies, relative to the first appended row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSpan {
    pub start: usize,
    pub len: usize,
}

/// Builds the rows to append for a list of groups, in stable group order.
///
/// Only the first row of each group carries merchant and date; the rest
/// leave both blank for the later cell merge. Also returns each group's span
/// so the append path can issue merge requests for spans longer than one row.
pub fn build_rows(groups: &[TransactionGroup]) -> (Vec<Vec<String>>, Vec<GroupSpan>) {
    let mut rows = Vec::new();
    let mut spans = Vec::new();
    for group in groups {
        spans.push(GroupSpan {
            start: rows.len(),
            len: group.items.len(),
        });
        for (ix, item) in group.items.iter().enumerate() {
            let (merchant, date) = if ix == 0 {
                (group.merchant.clone(), sheet_date(group.date))
            } else {
                (String::new(), String::new())
            };
            rows.push(vec![
                merchant,
                date,
                item.category.clone(),
                item.item.clone(),
                item.cost.to_sheet_value(),
            ]);
        }
    }
    (rows, spans)
}

fn cell(row: &[String], ix: usize) -> &str {
    row.get(ix).map(|s| s.trim()).unwrap_or("")
}
