//! Owner payment settlement: the debtor has paid, so pay out the buyers.

use rusqlite::{params, Connection};

use chunkfund_shared::settlement::{group_holdings, SettlementPlan};
use chunkfund_shared::types::{
    InvoiceId, InvoiceStatus, Party, TransactionStatus, TransferKind, UserId,
};

use crate::cash_transfers::append_transfer;
use crate::database::{get_count, Database};
use crate::error::{Result, StoreError};
use crate::invoices::{find_invoice, set_invoice_status};
use crate::models::SettlementReport;
use crate::users::platform_owner_id;

impl Database {
    /// Record that the debtor paid `invoice_id` and distribute the money.
    ///
    /// Only the invoice owner may settle, and only an Active invoice.  The
    /// status changes, the platform owner account (when first needed) and
    /// every transfer commit as one SQL transaction; any failure leaves the
    /// ledger untouched.
    pub fn settle_owner_payment(
        &mut self,
        invoice_id: InvoiceId,
        acting_user: UserId,
    ) -> Result<SettlementReport> {
        let tx = self.conn_mut().transaction()?;
        let report = settle_in(&tx, invoice_id, acting_user)?;
        tx.commit()?;

        tracing::info!(
            invoice_id = %invoice_id,
            owner = %acting_user,
            platform_fee = report.plan.platform_fee,
            buyers = report.plan.buyer_payouts.len(),
            transfers = report.transfers.len(),
            "invoice settled"
        );

        Ok(report)
    }
}

fn settle_in(
    conn: &Connection,
    invoice_id: InvoiceId,
    acting_user: UserId,
) -> Result<SettlementReport> {
    let invoice = find_invoice(conn, invoice_id)?.ok_or(StoreError::InvoiceNotFound(invoice_id))?;

    if invoice.owner != acting_user {
        return Err(StoreError::NotInvoiceOwner {
            invoice: invoice_id,
            user: acting_user,
        });
    }
    if invoice.status != InvoiceStatus::Active {
        return Err(StoreError::InvalidStatus {
            invoice: invoice_id,
            expected: InvoiceStatus::Active,
            actual: invoice.status,
        });
    }

    let platform_owner = platform_owner_id(conn)?;

    // 1. Status changes.
    set_invoice_status(conn, invoice_id, InvoiceStatus::Paid)?;
    conn.execute(
        "UPDATE transactions SET status = ?1 WHERE invoice_id = ?2 AND status = ?3",
        params![
            TransactionStatus::PaidOut.as_str(),
            invoice_id.0,
            TransactionStatus::Active.as_str(),
        ],
    )?;

    // 2-3. Fee and per-chunk payout over the holdings just paid out.
    let holdings = group_holdings(paid_out_purchases(conn, invoice_id)?);
    let plan = SettlementPlan::compute(invoice.original_amount, invoice.chunks_total, &holdings)?;

    if plan.total_profit <= 0.0 {
        tracing::warn!(
            invoice_id = %invoice_id,
            total_profit = plan.total_profit,
            platform_fee = plan.platform_fee,
            "settling invoice without profit"
        );
    }

    let owner = Party::invoice_owner(invoice.owner);
    let mut transfers = Vec::with_capacity(plan.buyer_payouts.len() + 3);

    // 4. Debtor pays the owner.
    transfers.push(append_transfer(
        conn,
        invoice_id,
        TransferKind::DebtorPayment,
        invoice.original_amount,
        Party::debtor(),
        owner,
    )?);

    // 5. Platform fee.
    if plan.charges_fee() {
        transfers.push(append_transfer(
            conn,
            invoice_id,
            TransferKind::PlatformFee,
            plan.platform_fee,
            owner,
            Party::platform_owner(platform_owner),
        )?);
    }

    // 6. One payout per buyer.
    for payout in &plan.buyer_payouts {
        transfers.push(append_transfer(
            conn,
            invoice_id,
            TransferKind::BuyerPayout,
            payout.amount,
            owner,
            Party::buyer(payout.buyer),
        )?);
    }

    // 7. Rounding leftover stays with the owner.
    if plan.keeps_residual() {
        transfers.push(append_transfer(
            conn,
            invoice_id,
            TransferKind::OwnerResidual,
            plan.residual,
            owner,
            owner,
        )?);
    }

    Ok(SettlementReport {
        invoice_id,
        plan,
        transfers,
    })
}

fn paid_out_purchases(conn: &Connection, invoice_id: InvoiceId) -> Result<Vec<(UserId, u32)>> {
    let mut stmt = conn.prepare(
        "SELECT buyer_user_id, chunks_purchased FROM transactions
         WHERE invoice_id = ?1 AND status = ?2",
    )?;

    let rows = stmt.query_map(
        params![invoice_id.0, TransactionStatus::PaidOut.as_str()],
        |row| Ok((UserId(row.get(0)?), get_count(row, 1)?)),
    )?;

    let mut purchases = Vec::new();
    for row in rows {
        purchases.push(row?);
    }
    Ok(purchases)
}
