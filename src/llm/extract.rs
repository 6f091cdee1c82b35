//! The extraction engine: unstructured input (receipt photos, free text) to
//! validated, normalized line items.

use crate::error::{Error, Result};
use crate::llm::client::{ChatMessage, Completer, ContentPart};
use crate::llm::prompts::EXTRACTION_PROMPT;
use crate::model::{normalize_items, LineItem, RawLineItem};
use anyhow::anyhow;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

/// One receipt image: raw bytes plus the MIME type used for the data URL.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// The shape the provider's output must conform to. Field semantics are still
/// defended in normalization; a schema constrains shape, not meaning.
#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    items: Vec<RawLineItem>,
}

/// Extracts line items from images and/or free text.
///
/// At least one input must be present. All provider-side failures
/// (transport, unparseable output, schema mismatch) surface uniformly as
/// `Error::ExtractionFailed`; an extraction that survives the schema but
/// yields nothing usable is `Error::NoReceiptDetected`.
pub async fn extract_line_items(
    completer: &dyn Completer,
    images: &[ImageInput],
    text: Option<&str>,
    today: NaiveDate,
) -> Result<Vec<LineItem>> {
    let text = text.map(str::trim).filter(|t| !t.is_empty());
    if images.is_empty() && text.is_none() {
        return Err(Error::NoInputProvided);
    }
    for image in images {
        if image.bytes.is_empty() {
            return Err(Error::ImageUploadFailed(anyhow!("Image file was empty")));
        }
    }

    let messages = build_messages(images, text, today);
    let payload = completer
        .complete(messages, "receipt_extraction", extraction_schema())
        .await
        .map_err(Error::ExtractionFailed)?;
    let parsed: ExtractionPayload = serde_json::from_value(payload)
        .map_err(|e| Error::ExtractionFailed(anyhow!(e).context("Model output did not match the extraction schema")))?;

    let items = normalize_items(parsed.items, today);
    if items.is_empty() {
        return Err(Error::NoReceiptDetected);
    }
    tracing::debug!("Extracted {} line item(s)", items.len());
    Ok(items)
}

fn build_messages(images: &[ImageInput], text: Option<&str>, today: NaiveDate) -> Vec<ChatMessage> {
    let system = EXTRACTION_PROMPT.replace("{TODAY}", &today.format("%Y-%m-%d").to_string());

    let mut parts = Vec::new();
    if let Some(text) = text {
        parts.push(ContentPart::text(text));
    }
    for image in images {
        parts.push(ContentPart::image(&image.mime_type, &image.bytes));
    }

    vec![ChatMessage::system(system), ChatMessage::user_parts(parts)]
}

fn extraction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "merchant": { "type": "string" },
                        "date": { "type": "string", "pattern": "^\\d{4}-\\d{2}-\\d{2}$" },
                        "category": { "type": "string" },
                        "item": { "type": "string" },
                        "cost": { "type": "number" },
                    },
                    "required": ["merchant", "date", "category", "item", "cost"],
                    "additionalProperties": false,
                }
            }
        },
        "required": ["items"],
        "additionalProperties": false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockCompleter;
    use std::str::FromStr;

    fn today() -> NaiveDate {
        NaiveDate::from_str("2024-06-15").unwrap()
    }

    fn image() -> ImageInput {
        ImageInput {
            bytes: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_no_input_is_rejected() {
        let mock = MockCompleter::default();
        let err = extract_line_items(&mock, &[], None, today()).await.unwrap_err();
        assert!(matches!(err, Error::NoInputProvided));
    }

    #[tokio::test]
    async fn test_whitespace_text_counts_as_no_input() {
        let mock = MockCompleter::default();
        let err = extract_line_items(&mock, &[], Some("   "), today())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoInputProvided));
    }

    #[tokio::test]
    async fn test_empty_image_is_upload_failure() {
        let mock = MockCompleter::default();
        let empty = ImageInput {
            bytes: Vec::new(),
            mime_type: "image/png".to_string(),
        };
        let err = extract_line_items(&mock, &[empty], None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ImageUploadFailed(_)));
    }

    #[tokio::test]
    async fn test_successful_extraction() {
        let mock = MockCompleter::with_response(
            "receipt_extraction",
            json!({
                "items": [{
                    "merchant": " Acme Mart ",
                    "date": "2024-03-01",
                    "category": "Groceries",
                    "item": "Milk",
                    "cost": 3.49,
                }]
            }),
        );
        let items = extract_line_items(&mock, &[], Some("milk from acme"), today())
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].merchant, "Acme Mart");
    }

    #[tokio::test]
    async fn test_provider_failure_is_uniform() {
        // The mock has no canned response, standing in for any provider-side
        // failure. The caller sees only the stable category.
        let mock = MockCompleter::default();
        let err = extract_line_items(&mock, &[image()], None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));
        assert_eq!(err.to_string(), "OpenAI failed to respond");
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_extraction_failed() {
        let mock = MockCompleter::with_response("receipt_extraction", json!({ "rows": [] }));
        let err = extract_line_items(&mock, &[image()], None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn test_items_missing_cost_yield_no_receipt_detected() {
        let mock = MockCompleter::with_response(
            "receipt_extraction",
            json!({
                "items": [
                    { "merchant": "Acme", "date": "2024-03-01", "category": "Food", "item": "Milk" },
                    { "merchant": "Acme", "date": "2024-03-01", "category": "Food", "item": "Eggs" },
                ]
            }),
        );
        let err = extract_line_items(&mock, &[image()], None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoReceiptDetected));
    }

    #[tokio::test]
    async fn test_empty_item_list_is_no_receipt_detected() {
        let mock = MockCompleter::with_response("receipt_extraction", json!({ "items": [] }));
        let err = extract_line_items(&mock, &[image()], None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoReceiptDetected));
    }
}
