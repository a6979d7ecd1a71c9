use thiserror::Error;

/// Violations of the pure ledger rules (chunking, fees, payouts).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("{field} must be a positive, finite amount (got {value})")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("Sale price {0:.2} is below the price of a single chunk")]
    SalePriceBelowChunk(f64),

    #[error("Invoice has no chunks to settle")]
    ZeroChunks,
}
