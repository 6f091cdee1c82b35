//! The line item model: one extracted purchase entry.

use crate::model::{normalize_date, Amount};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default category for items the model leaves uncategorized.
const FALLBACK_CATEGORY: &str = "Other";

/// One purchase entry extracted from a receipt image or a description.
///
/// Every field is required and non-empty once normalization has run; `cost`
/// is always numeric, never a currency-formatted string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LineItem {
    pub merchant: String,
    pub date: NaiveDate,
    pub category: String,
    pub item: String,
    pub cost: Amount,
}

/// A line item exactly as the model returned it, before normalization.
///
/// The schema constrains the shape, but not the semantics: a loosely
/// conforming provider can still hand back untrimmed strings or a stringified
/// number, so every field is taken as-is and cleaned up in
/// [`normalize_items`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLineItem {
    #[serde(default)]
    pub merchant: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub cost: serde_json::Value,
}

/// Normalizes raw extraction output into clean line items.
///
/// String fields are trimmed; `cost` is coerced to a number (parsing a string
/// if necessary, defaulting to zero on failure); items missing a merchant,
/// an item description, or a cost are dropped. Dates that fail to parse fall
/// back to `default_date` (the caller's local today).
pub fn normalize_items(raw: Vec<RawLineItem>, default_date: NaiveDate) -> Vec<LineItem> {
    raw.into_iter()
        .filter_map(|item| normalize_item(item, default_date))
        .collect()
}

fn normalize_item(raw: RawLineItem, default_date: NaiveDate) -> Option<LineItem> {
    let merchant = raw.merchant.trim().to_string();
    let description = raw.item.trim().to_string();
    let cost = coerce_cost(&raw.cost)?;
    if merchant.is_empty() || description.is_empty() {
        return None;
    }

    let date = normalize_date(raw.date.trim()).unwrap_or(default_date);
    let category = match raw.category.trim() {
        "" => FALLBACK_CATEGORY.to_string(),
        c => c.to_string(),
    };

    Some(LineItem {
        merchant,
        date,
        category,
        item: description,
        cost,
    })
}

/// Coerces a schema-valid-but-loose cost value into an `Amount`.
///
/// Numbers pass through; strings get a numeric parse that defaults to zero;
/// an absent cost drops the item.
fn coerce_cost(value: &serde_json::Value) -> Option<Amount> {
    match value {
        serde_json::Value::Number(n) => Some(Amount::from_f64_lossy(n.as_f64()?)),
        serde_json::Value::String(s) => Some(Amount::parse_lenient(s)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn raw(merchant: &str, date: &str, category: &str, item: &str, cost: serde_json::Value) -> RawLineItem {
        RawLineItem {
            merchant: merchant.to_string(),
            date: date.to_string(),
            category: category.to_string(),
            item: item.to_string(),
            cost,
        }
    }

    #[test]
    fn test_normalize_trims_and_parses() {
        let items = normalize_items(
            vec![raw(
                "  Acme Mart ",
                "2024-03-01",
                " Groceries ",
                " Milk ",
                serde_json::json!(3.49),
            )],
            day("2024-01-01"),
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].merchant, "Acme Mart");
        assert_eq!(items[0].category, "Groceries");
        assert_eq!(items[0].item, "Milk");
        assert_eq!(items[0].date, day("2024-03-01"));
        assert_eq!(items[0].cost.value(), Decimal::from_str("3.49").unwrap());
    }

    #[test]
    fn test_normalize_coerces_string_cost() {
        let items = normalize_items(
            vec![raw("Acme", "2024-03-01", "Food", "Bread", serde_json::json!("4.25"))],
            day("2024-01-01"),
        );
        assert_eq!(items[0].cost.value(), Decimal::from_str("4.25").unwrap());
    }

    #[test]
    fn test_normalize_unparseable_string_cost_is_zero() {
        let items = normalize_items(
            vec![raw("Acme", "2024-03-01", "Food", "Bread", serde_json::json!("free?"))],
            day("2024-01-01"),
        );
        assert!(items[0].cost.is_zero());
    }

    #[test]
    fn test_normalize_drops_missing_cost() {
        let items = normalize_items(
            vec![raw("Acme", "2024-03-01", "Food", "Bread", serde_json::Value::Null)],
            day("2024-01-01"),
        );
        assert!(items.is_empty());
    }

    #[test]
    fn test_normalize_drops_blank_merchant_or_item() {
        let items = normalize_items(
            vec![
                raw("  ", "2024-03-01", "Food", "Bread", serde_json::json!(1)),
                raw("Acme", "2024-03-01", "Food", "   ", serde_json::json!(1)),
            ],
            day("2024-01-01"),
        );
        assert!(items.is_empty());
    }

    #[test]
    fn test_normalize_defaults_bad_date_to_today() {
        let today = day("2024-06-15");
        let items = normalize_items(
            vec![raw("Acme", "last tuesday", "Food", "Bread", serde_json::json!(1))],
            today,
        );
        assert_eq!(items[0].date, today);
    }

    #[test]
    fn test_normalize_defaults_blank_category() {
        let items = normalize_items(
            vec![raw("Acme", "2024-03-01", "", "Bread", serde_json::json!(1))],
            day("2024-01-01"),
        );
        assert_eq!(items[0].category, "Other");
    }
}
