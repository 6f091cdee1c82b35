//! Brings a tab's structure to its canonical shape: header text, per-column
//! formats, borders, frozen header, and column widths.
//!
//! Everything here is safe to re-run any number of times. The only cell
//! values ever written are the fixed header row (an overwrite, so repeated
//! runs converge); every other request is presentation-only and cannot alter
//! data.

use crate::api::{SheetStore, CHAT_HISTORY, TRANSACTIONS};
use crate::error::Result;
use serde_json::{json, Value};

/// The exact header text for the Transactions tab, columns A-E.
pub const TRANSACTION_HEADERS: [&str; 5] = ["Merchant", "Date", "Category", "Item", "Cost"];

/// The exact header text for the Chat History tab, columns A-C.
pub const CHAT_HEADERS: [&str; 3] = ["Role", "Message", "Timestamp"];

/// Borders are applied through this row up front so appends never need
/// per-row border updates.
const BORDERED_ROWS: i64 = 2000;

/// Suggested pixel widths for the Transactions columns; Item is widest.
const TRANSACTION_WIDTHS: [i64; 5] = [140, 130, 110, 260, 90];

/// Suggested pixel widths for the Chat History columns; Message is widest.
const CHAT_WIDTHS: [i64; 3] = [90, 420, 180];

/// Ensures the Transactions tab exists and has the canonical layout.
pub async fn ensure_transactions_layout(store: &mut dyn SheetStore) -> Result<()> {
    let sheet_id = store.get_or_create_sheet(TRANSACTIONS).await?;
    store
        .update_values(TRANSACTIONS, "A1:E1", &[to_row(&TRANSACTION_HEADERS)])
        .await?;
    store.batch_update(transaction_requests(sheet_id)).await?;
    Ok(())
}

/// Ensures the Chat History tab exists and has the canonical layout.
pub async fn ensure_chat_layout(store: &mut dyn SheetStore) -> Result<()> {
    let sheet_id = store.get_or_create_sheet(CHAT_HISTORY).await?;
    store
        .update_values(CHAT_HISTORY, "A1:C1", &[to_row(&CHAT_HEADERS)])
        .await?;
    store.batch_update(chat_requests(sheet_id)).await?;
    Ok(())
}

fn to_row(headers: &[&str]) -> Vec<String> {
    headers.iter().map(|h| h.to_string()).collect()
}

/// The structural requests for the Transactions tab.
fn transaction_requests(sheet_id: i64) -> Vec<Value> {
    let mut requests = vec![
        header_format(sheet_id, TRANSACTION_HEADERS.len() as i64),
        freeze_header(sheet_id),
        // A: merchant, left-aligned text.
        column_format(sheet_id, 0, text_format("LEFT")),
        // B: date, rendered as "Month D, YYYY".
        column_format(
            sheet_id,
            1,
            json!({
                "numberFormat": { "type": "DATE", "pattern": "mmmm d, yyyy" },
                "horizontalAlignment": "LEFT",
            }),
        ),
        // C: category, left-aligned text.
        column_format(sheet_id, 2, text_format("LEFT")),
        // D: item description, wrapped.
        column_format(sheet_id, 3, json!({ "wrapStrategy": "WRAP" })),
        // E: cost, currency, right-aligned.
        column_format(
            sheet_id,
            4,
            json!({
                "numberFormat": { "type": "CURRENCY", "pattern": "$#,##0.00" },
                "horizontalAlignment": "RIGHT",
            }),
        ),
        borders(sheet_id, TRANSACTION_HEADERS.len() as i64),
    ];
    requests.extend(column_widths(sheet_id, &TRANSACTION_WIDTHS));
    requests
}

/// The structural requests for the Chat History tab.
fn chat_requests(sheet_id: i64) -> Vec<Value> {
    let mut requests = vec![
        header_format(sheet_id, CHAT_HEADERS.len() as i64),
        freeze_header(sheet_id),
        // B: message text, wrapped.
        column_format(sheet_id, 1, json!({ "wrapStrategy": "WRAP" })),
        borders(sheet_id, CHAT_HEADERS.len() as i64),
    ];
    requests.extend(column_widths(sheet_id, &CHAT_WIDTHS));
    requests
}

/// Bold, left-aligned, middle-aligned header row.
fn header_format(sheet_id: i64, columns: i64) -> Value {
    json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": 0,
                "endRowIndex": 1,
                "startColumnIndex": 0,
                "endColumnIndex": columns,
            },
            "cell": {
                "userEnteredFormat": {
                    "textFormat": { "bold": true },
                    "horizontalAlignment": "LEFT",
                    "verticalAlignment": "MIDDLE",
                }
            },
            "fields": "userEnteredFormat(textFormat,horizontalAlignment,verticalAlignment)",
        }
    })
}

fn freeze_header(sheet_id: i64) -> Value {
    json!({
        "updateSheetProperties": {
            "properties": {
                "sheetId": sheet_id,
                "gridProperties": { "frozenRowCount": 1 },
            },
            "fields": "gridProperties.frozenRowCount",
        }
    })
}

fn text_format(alignment: &str) -> Value {
    json!({
        "numberFormat": { "type": "TEXT" },
        "horizontalAlignment": alignment,
    })
}

/// Formats one data column (row 2 downward).
fn column_format(sheet_id: i64, column: i64, user_entered_format: Value) -> Value {
    let fields: Vec<String> = user_entered_format
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default();
    json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": 1,
                "startColumnIndex": column,
                "endColumnIndex": column + 1,
            },
            "cell": { "userEnteredFormat": user_entered_format },
            "fields": format!("userEnteredFormat({})", fields.join(",")),
        }
    })
}

/// Thin light-gray borders, inner and outer, across a generous fixed range.
fn borders(sheet_id: i64, columns: i64) -> Value {
    let border = json!({
        "style": "SOLID",
        "colorStyle": { "rgbColor": { "red": 0.85, "green": 0.85, "blue": 0.85 } },
    });
    json!({
        "updateBorders": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": 0,
                "endRowIndex": BORDERED_ROWS,
                "startColumnIndex": 0,
                "endColumnIndex": columns,
            },
            "top": border,
            "bottom": border,
            "left": border,
            "right": border,
            "innerHorizontal": border,
            "innerVertical": border,
        }
    })
}

fn column_widths(sheet_id: i64, widths: &[i64]) -> Vec<Value> {
    widths
        .iter()
        .enumerate()
        .map(|(ix, width)| {
            json!({
                "updateDimensionProperties": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "COLUMNS",
                        "startIndex": ix,
                        "endIndex": ix + 1,
                    },
                    "properties": { "pixelSize": width },
                    "fields": "pixelSize",
                }
            })
        })
        .collect()
}
