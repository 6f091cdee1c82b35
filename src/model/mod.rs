//! Domain models: amounts, line items, transactions, chat entries.

mod amount;
mod chat;
mod line_item;
mod transaction;

pub use amount::Amount;
pub use chat::{ChatEntry, ChatRole};
pub use line_item::{normalize_items, LineItem, RawLineItem};
pub use transaction::{
    build_rows, existing_totals, find_duplicate, group_items, normalize_date, parse_transactions,
    sheet_date, GroupSpan, TransactionGroup,
};
