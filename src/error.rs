//! Error types for spendsheet.
//!
//! Each variant carries the one stable, user-presentable message for its
//! category. Provider and transport details attach as sources so the message
//! shown to the user never changes when Google or OpenAI change their error
//! wording.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Input errors: reported synchronously, never retried.
    #[error("Please provide a receipt image or a description of the purchase")]
    NoInputProvided,

    #[error("Not a valid Google Sheets URL")]
    InvalidSheetUrl,

    // Collaborator-not-found: distinguishable from transport failure so the
    // caller can decide whether to run initialization.
    #[error("Sheet tab '{0}' was not found in the spreadsheet")]
    TableNotFound(String),

    #[error("The Transactions sheet was not found. Run 'spendsheet init' first")]
    TransactionsTableNotFound,

    // Extraction and validation.
    #[error("Failed to read the receipt image")]
    ImageUploadFailed(#[source] anyhow::Error),

    #[error("OpenAI failed to respond")]
    ExtractionFailed(#[source] anyhow::Error),

    #[error("No receipt details could be detected in the input")]
    NoReceiptDetected,

    // Conflict: resolved by user confirmation, not by retry.
    #[error("A matching transaction for '{merchant}' on {date} already exists")]
    DuplicateDetected { merchant: String, date: String },

    // Fatal transport and write failures.
    #[error("The spreadsheet could not be reached")]
    StoreUnavailable(#[source] anyhow::Error),

    #[error("Failed to read transactions from the spreadsheet")]
    ReadFailed(#[source] anyhow::Error),

    #[error("Failed to add the transaction to the spreadsheet")]
    AppendFailed(#[source] anyhow::Error),

    #[error("Failed to set up the spreadsheet")]
    InitializationFailed(#[source] anyhow::Error),

    #[error("OpenAI failed to respond")]
    LlmUnavailable(#[source] anyhow::Error),

    // Everything outside the operation contracts (config files, CLI setup).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
