use chunkfund_shared::error::LedgerError;
use chunkfund_shared::types::{InvoiceId, InvoiceStatus, UserId};
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("User {user} is not the owner of invoice {invoice}")]
    NotInvoiceOwner { invoice: InvoiceId, user: UserId },

    #[error("Invoice {invoice} is {actual}, expected {expected}")]
    InvalidStatus {
        invoice: InvoiceId,
        expected: InvoiceStatus,
        actual: InvoiceStatus,
    },

    #[error("Requested {requested} chunks but only {remaining} remain")]
    InsufficientChunks { requested: u32, remaining: u32 },

    #[error("Chunk count must be at least 1")]
    InvalidChunkCount,

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
