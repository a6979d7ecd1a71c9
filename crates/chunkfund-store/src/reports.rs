//! Read-only summaries: invoice detail, per-user dashboard, platform totals.

use std::collections::BTreeMap;

use rusqlite::params;

use chunkfund_shared::constants::CHUNK_PRICE;
use chunkfund_shared::settlement::{chunk_profit_preview, SettlementPlan};
use chunkfund_shared::types::{InvoiceId, InvoiceStatus, TransferKind, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::models::{CashFlow, Holding, InvoiceDetail, PlatformEarnings, UserDashboard};

impl Database {
    /// An invoice with its purchases and transfer log.
    pub fn invoice_detail(&self, invoice_id: InvoiceId) -> Result<InvoiceDetail> {
        let invoice = self.get_invoice(invoice_id)?;
        let preview = chunk_profit_preview(invoice.original_amount, invoice.desired_sale_price)?;

        Ok(InvoiceDetail {
            chunks_remaining: invoice.chunks_remaining(),
            funded_percent: invoice.funded_percent(),
            chunk_profit_preview: preview,
            transactions: self.list_transactions_for_invoice(invoice_id)?,
            transfers: self.list_transfers_for_invoice(invoice_id)?,
            invoice,
        })
    }

    /// Everything one user owns, holds, and has been paid.
    pub fn user_dashboard(&self, user_id: UserId) -> Result<UserDashboard> {
        let user = self.get_user(user_id)?;
        let owned_invoices = self.list_invoices_by_owner(user_id)?;

        let mut held: BTreeMap<InvoiceId, u32> = BTreeMap::new();
        for txn in self.list_transactions_for_buyer(user_id)? {
            *held.entry(txn.invoice_id).or_default() += txn.chunks_purchased;
        }

        let mut holdings = Vec::with_capacity(held.len());
        for (invoice_id, chunks_held) in held {
            let invoice = self.get_invoice(invoice_id)?;
            let plan = SettlementPlan::compute(invoice.original_amount, invoice.chunks_total, &[])?;
            holdings.push(Holding {
                invoice_id,
                debtor_name: invoice.debtor_name,
                invoice_status: invoice.status,
                chunks_held,
                amount_paid: f64::from(chunks_held) * CHUNK_PRICE,
                projected_payout_per_chunk: plan.net_payout_per_chunk,
                projected_payout: f64::from(chunks_held) * plan.net_payout_per_chunk,
            });
        }

        let cash_flow = CashFlow::new(
            self.total_received_by(user_id)?,
            self.total_sent_by(user_id)?,
        );

        Ok(UserDashboard {
            user,
            owned_invoices,
            holdings,
            cash_flow,
        })
    }

    /// Fees collected by the platform owner so far.
    pub fn platform_earnings(&self) -> Result<PlatformEarnings> {
        let platform_owner = self.ensure_platform_owner()?;

        let total_fees: f64 = self.conn().query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM cash_transfers
             WHERE event_kind = ?1 AND to_user_id = ?2",
            params![TransferKind::PlatformFee.as_str(), platform_owner.0],
            |row| row.get(0),
        )?;

        let settled: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM invoices WHERE status = ?1",
            params![InvoiceStatus::Paid.as_str()],
            |row| row.get(0),
        )?;

        Ok(PlatformEarnings {
            platform_owner,
            total_fees,
            settled_invoices: u32::try_from(settled).unwrap_or(u32::MAX),
        })
    }
}
