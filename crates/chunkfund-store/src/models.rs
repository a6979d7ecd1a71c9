//! Domain model structs persisted in the ledger database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the API
//! layer as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chunkfund_shared::format::party_label;
use chunkfund_shared::settlement::SettlementPlan;
use chunkfund_shared::types::{
    InvoiceId, InvoiceStatus, Party, TransactionId, TransactionStatus, TransferId, TransferKind,
    UserId,
};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Unique across the ledger.
    pub username: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Invoice
// ---------------------------------------------------------------------------

/// An invoice listed for fractional sale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: InvoiceId,
    pub owner: UserId,
    /// Free-text name of whoever owes the original amount.
    pub debtor_name: String,
    /// Face value the debtor will pay.
    pub original_amount: f64,
    /// Free text, e.g. "Net 30".
    pub payment_terms: String,
    /// What the owner wants to raise by selling chunks.
    pub desired_sale_price: f64,
    /// `floor(desired_sale_price / 100)`.
    pub chunks_total: u32,
    /// Never decreases; never exceeds `chunks_total`.
    pub chunks_sold: u32,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn chunks_remaining(&self) -> u32 {
        self.chunks_total.saturating_sub(self.chunks_sold)
    }

    /// Percentage of chunks sold, 0..=100.
    pub fn funded_percent(&self) -> f64 {
        if self.chunks_total == 0 {
            return 0.0;
        }
        f64::from(self.chunks_sold) / f64::from(self.chunks_total) * 100.0
    }
}

/// Input for [`Database::create_invoice`](crate::Database::create_invoice).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub debtor_name: String,
    pub original_amount: f64,
    pub payment_terms: String,
    pub desired_sale_price: f64,
}

// ---------------------------------------------------------------------------
// Transaction (chunk purchase)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub invoice_id: InvoiceId,
    pub buyer: UserId,
    pub chunks_purchased: u32,
    pub status: TransactionStatus,
    pub purchased_at: DateTime<Utc>,
}

/// Result of a chunk purchase.  `activated` is set when this purchase sold
/// the last chunk and flipped the invoice to Active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub transaction: Transaction,
    pub activated: bool,
}

// ---------------------------------------------------------------------------
// Cash transfer
// ---------------------------------------------------------------------------

/// One immutable row of the audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashTransfer {
    pub id: TransferId,
    pub invoice_id: InvoiceId,
    pub kind: TransferKind,
    pub description: String,
    pub amount: f64,
    pub from: Party,
    pub to: Party,
    pub timestamp: DateTime<Utc>,
}

impl CashTransfer {
    pub fn from_label(&self) -> String {
        party_label(&self.from)
    }

    pub fn to_label(&self) -> String {
        party_label(&self.to)
    }
}

/// All transfers recorded against one invoice, for the history view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceTransfers {
    pub invoice_id: InvoiceId,
    pub debtor_name: String,
    pub original_amount: f64,
    pub transfers: Vec<CashTransfer>,
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// What an owner payment settlement computed and wrote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementReport {
    pub invoice_id: InvoiceId,
    pub plan: SettlementPlan,
    pub transfers: Vec<CashTransfer>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// An invoice with everything recorded against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub chunks_remaining: u32,
    pub funded_percent: f64,
    /// Expected profit per chunk before fees.
    pub chunk_profit_preview: f64,
    pub transactions: Vec<Transaction>,
    pub transfers: Vec<CashTransfer>,
}

/// A buyer's position in one invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    pub invoice_id: InvoiceId,
    pub debtor_name: String,
    pub invoice_status: InvoiceStatus,
    pub chunks_held: u32,
    /// `chunks_held * 100`.
    pub amount_paid: f64,
    /// Payout per chunk if the invoice settled now, after the platform fee.
    pub projected_payout_per_chunk: f64,
    pub projected_payout: f64,
}

/// Money into and out of one user, summed over the transfer log.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CashFlow {
    pub received: f64,
    pub sent: f64,
    /// `received - sent`.
    pub net: f64,
}

impl CashFlow {
    pub fn new(received: f64, sent: f64) -> Self {
        Self {
            received,
            sent,
            net: received - sent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDashboard {
    pub user: User,
    pub owned_invoices: Vec<Invoice>,
    pub holdings: Vec<Holding>,
    pub cash_flow: CashFlow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlatformEarnings {
    pub platform_owner: UserId,
    pub total_fees: f64,
    pub settled_invoices: u32,
}
