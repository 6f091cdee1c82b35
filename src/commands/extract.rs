//! Extract and scan commands: receipt input to line items, and the full
//! extract-then-append pipeline.

use crate::api::SheetStore;
use crate::commands::{append, AppendSummary, Out};
use crate::error::{Error, Result};
use crate::llm::{extract_line_items, Completer, ImageInput};
use crate::model::LineItem;
use anyhow::{anyhow, Context};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extracts line items from receipt images and/or a free-text description.
///
/// # Arguments
/// - `image_paths` - Paths to receipt photos; each is read and inlined.
/// - `text` - A free-text purchase description, e.g. "12 dollars for lunch
///   at Joe's yesterday".
///
/// # Errors
/// - `Error::NoInputProvided` when both inputs are absent.
/// - `Error::ImageUploadFailed` when an image cannot be read.
/// - `Error::ExtractionFailed` for any provider-side failure.
/// - `Error::NoReceiptDetected` when nothing usable was extracted.
pub async fn extract(
    completer: &dyn Completer,
    image_paths: &[PathBuf],
    text: Option<&str>,
) -> Result<Out<Vec<LineItem>>> {
    let images = load_images(image_paths).await?;
    let today = chrono::Local::now().date_naive();
    let items = extract_line_items(completer, &images, text, today).await?;
    let message = format!("Extracted {} line item(s)", items.len());
    Ok(Out::new(message, items))
}

/// The primary pipeline: extract line items, then reconcile and append them.
pub async fn scan(
    store: &mut dyn SheetStore,
    completer: &dyn Completer,
    image_paths: &[PathBuf],
    text: Option<&str>,
) -> Result<Out<AppendSummary>> {
    let extracted = extract(completer, image_paths, text).await?;
    let items = extracted.structure().cloned().unwrap_or_default();
    append(store, items).await
}

async fn load_images(paths: &[PathBuf]) -> Result<Vec<ImageInput>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image at {}", path.display()))
            .map_err(Error::ImageUploadFailed)?;
        if bytes.is_empty() {
            return Err(Error::ImageUploadFailed(anyhow!(
                "Image file at {} is empty",
                path.display()
            )));
        }
        debug!("Loaded image {} ({} bytes)", path.display(), bytes.len());
        images.push(ImageInput {
            bytes,
            mime_type: mime_type_for(path).to_string(),
        });
    }
    Ok(images)
}

/// Maps a file extension to the MIME type used in the image data URL.
fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        // Receipts are overwhelmingly phone-camera JPEGs.
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompleter;
    use tempfile::TempDir;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("r.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("r.jpg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("r.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("receipt")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_extract_missing_image_file() {
        let mock = MockCompleter::seeded();
        let missing = PathBuf::from("/definitely/not/here.jpg");
        let err = extract(&mock, &[missing], None).await.unwrap_err();
        assert!(matches!(err, Error::ImageUploadFailed(_)));
    }

    #[tokio::test]
    async fn test_extract_empty_image_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.jpg");
        std::fs::write(&path, []).unwrap();
        let mock = MockCompleter::seeded();
        let err = extract(&mock, &[path], None).await.unwrap_err();
        assert!(matches!(err, Error::ImageUploadFailed(_)));
    }

    #[tokio::test]
    async fn test_extract_from_text() {
        let mock = MockCompleter::seeded();
        let out = extract(&mock, &[], Some("bread and butter at the corner market"))
            .await
            .unwrap();
        let items = out.structure().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].merchant, "Corner Market");
    }

    #[tokio::test]
    async fn test_scan_extracts_and_appends() {
        let mut store = crate::api::TestStore::default();
        let mock = MockCompleter::seeded();
        let out = scan(&mut store, &mock, &[], Some("bread and butter"))
            .await
            .unwrap();
        let summary = out.structure().unwrap();
        assert_eq!(summary.rows_added, 2);
        assert_eq!(summary.transactions_added, 1);
    }
}
