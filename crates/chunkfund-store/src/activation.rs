//! Activation: Pending -> Active once every chunk of an invoice is sold.

use rusqlite::{params, Connection};

use chunkfund_shared::constants::CHUNK_PRICE;
use chunkfund_shared::settlement::is_fully_funded;
use chunkfund_shared::types::{InvoiceId, InvoiceStatus, Party, TransactionStatus, TransferKind};

use crate::cash_transfers::append_transfer;
use crate::database::Database;
use crate::error::Result;
use crate::invoices::{find_invoice, set_invoice_status};

impl Database {
    /// Activate the invoice if it is Pending and fully sold.
    ///
    /// Returns whether activation happened.  A missing invoice, an invoice
    /// that is already Active or Paid, and an invoice with unsold chunks all
    /// yield `Ok(false)` and write nothing.
    pub fn check_activation(&mut self, invoice_id: InvoiceId) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;
        let activated = activate_if_funded(&tx, invoice_id)?;
        tx.commit()?;
        Ok(activated)
    }
}

/// Activation body, run inside the caller's SQL transaction.
///
/// The funding transfer records what buyers actually paid,
/// `chunks_total * CHUNK_PRICE`, which is the sale price rounded down to a
/// whole chunk and matches the amount settlement treats as paid in.
pub(crate) fn activate_if_funded(conn: &Connection, invoice_id: InvoiceId) -> Result<bool> {
    let Some(invoice) = find_invoice(conn, invoice_id)? else {
        return Ok(false);
    };

    if invoice.status != InvoiceStatus::Pending
        || !is_fully_funded(invoice.chunks_sold, invoice.chunks_total)
    {
        return Ok(false);
    }

    set_invoice_status(conn, invoice_id, InvoiceStatus::Active)?;

    let flipped = conn.execute(
        "UPDATE transactions SET status = ?1 WHERE invoice_id = ?2 AND status = ?3",
        params![
            TransactionStatus::Active.as_str(),
            invoice_id.0,
            TransactionStatus::PendingActivation.as_str(),
        ],
    )?;

    let collected = f64::from(invoice.chunks_total) * CHUNK_PRICE;
    append_transfer(
        conn,
        invoice_id,
        TransferKind::Funding,
        collected,
        Party::collective_buyers(),
        Party::invoice_owner(invoice.owner),
    )?;

    tracing::info!(
        invoice_id = %invoice_id,
        chunks_total = invoice.chunks_total,
        transactions = flipped,
        amount = collected,
        "invoice fully funded and activated"
    );

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewInvoice;
    use chunkfund_shared::types::{PartyRole, UserId};

    fn listed(db: &Database, sale: f64) -> (UserId, InvoiceId) {
        let owner = db.create_user("owner").unwrap();
        let invoice = db
            .create_invoice(
                owner.id,
                &NewInvoice {
                    debtor_name: "Debtor".into(),
                    original_amount: 50000.0,
                    payment_terms: "Net 30".into(),
                    desired_sale_price: sale,
                },
            )
            .unwrap();
        (owner.id, invoice.id)
    }

    #[test]
    fn missing_invoice_is_not_activated() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(!db.check_activation(InvoiceId(404)).unwrap());
    }

    #[test]
    fn partially_sold_invoice_stays_pending() {
        let mut db = Database::open_in_memory().unwrap();
        let (_, invoice) = listed(&db, 1000.0);
        let buyer = db.create_user("buyer").unwrap();
        db.purchase_chunks(invoice, buyer.id, 4).unwrap();

        assert!(!db.check_activation(invoice).unwrap());
        assert_eq!(db.get_invoice(invoice).unwrap().status, InvoiceStatus::Pending);
        assert!(db.list_transfers_for_invoice(invoice).unwrap().is_empty());
    }

    #[test]
    fn funding_records_whole_chunks_only() {
        let mut db = Database::open_in_memory().unwrap();
        let (owner, invoice) = listed(&db, 45099.0);
        let buyer = db.create_user("buyer").unwrap();

        let outcome = db.purchase_chunks(invoice, buyer.id, 450).unwrap();
        assert!(outcome.activated);

        let transfers = db.list_transfers_for_invoice(invoice).unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amount, 45000.0);
        assert_eq!(transfers[0].to, Party::invoice_owner(owner));
    }

    #[test]
    fn scenario_full_funding_activates_once() {
        let mut db = Database::open_in_memory().unwrap();
        let (owner, invoice) = listed(&db, 45000.0);
        let buyer = db.create_user("buyer").unwrap();

        // Simulate chunks_sold reaching the total outside the purchase path.
        db.conn()
            .execute(
                "UPDATE invoices SET chunks_sold = chunks_total WHERE invoice_id = ?1",
                params![invoice.0],
            )
            .unwrap();
        db.conn()
            .execute(
                "INSERT INTO transactions (invoice_id, buyer_user_id, chunks_purchased, purchase_timestamp)
                 VALUES (?1, ?2, 450, '2026-01-01T00:00:00.000000Z')",
                params![invoice.0, buyer.id.0],
            )
            .unwrap();

        assert!(db.check_activation(invoice).unwrap());

        let activated = db.get_invoice(invoice).unwrap();
        assert_eq!(activated.chunks_total, 450);
        assert_eq!(activated.status, InvoiceStatus::Active);

        let txns = db.list_transactions_for_invoice(invoice).unwrap();
        assert!(txns.iter().all(|t| t.status == TransactionStatus::Active));

        let transfers = db.list_transfers_for_invoice(invoice).unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].kind, TransferKind::Funding);
        assert_eq!(transfers[0].amount, 45000.0);
        assert_eq!(transfers[0].from.role, PartyRole::CollectiveBuyers);
        assert_eq!(transfers[0].to, Party::invoice_owner(owner));

        // Second call is a no-op.
        assert!(!db.check_activation(invoice).unwrap());
        assert_eq!(db.list_transfers_for_invoice(invoice).unwrap().len(), 1);
        assert_eq!(db.get_invoice(invoice).unwrap().status, InvoiceStatus::Active);
    }
}
