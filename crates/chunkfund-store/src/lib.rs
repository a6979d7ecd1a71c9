//! # chunkfund-store
//!
//! SQLite-backed ledger for fractional invoice sales.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed operations for the invoice
//! ledger, the chunk-purchase ledger, the append-only cash transfer log, and
//! the settlement engine that ties them together.  Every multi-statement
//! write runs inside a single SQL transaction.

pub mod activation;
pub mod cash_transfers;
pub mod database;
pub mod invoices;
pub mod migrations;
pub mod models;
pub mod reports;
pub mod settlement;
pub mod transactions;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
