//! Chunk purchases and the transaction ledger.

use rusqlite::{params, Connection};

use chunkfund_shared::types::{InvoiceId, InvoiceStatus, TransactionId, TransactionStatus, UserId};

use crate::activation::activate_if_funded;
use crate::database::{get_count, now_rfc3339, parse_column, parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::invoices::find_invoice;
use crate::models::{PurchaseOutcome, Transaction};
use crate::users::find_user;

const TRANSACTION_COLUMNS: &str =
    "transaction_id, invoice_id, buyer_user_id, chunks_purchased, status, purchase_timestamp";

impl Database {
    /// Buy `chunks` chunks of a Pending invoice.
    ///
    /// Validation, the `chunks_sold` increment, the transaction row and the
    /// activation check all commit together.  Asking for more chunks than
    /// remain is rejected, so `chunks_sold` never exceeds `chunks_total`.
    pub fn purchase_chunks(
        &mut self,
        invoice_id: InvoiceId,
        buyer: UserId,
        chunks: u32,
    ) -> Result<PurchaseOutcome> {
        if chunks == 0 {
            return Err(StoreError::InvalidChunkCount);
        }

        let tx = self.conn_mut().transaction()?;

        let invoice = find_invoice(&tx, invoice_id)?.ok_or(StoreError::InvoiceNotFound(invoice_id))?;
        if find_user(&tx, buyer)?.is_none() {
            return Err(StoreError::UserNotFound(buyer));
        }
        if invoice.status != InvoiceStatus::Pending {
            return Err(StoreError::InvalidStatus {
                invoice: invoice_id,
                expected: InvoiceStatus::Pending,
                actual: invoice.status,
            });
        }

        let remaining = invoice.chunks_remaining();
        if chunks > remaining {
            return Err(StoreError::InsufficientChunks {
                requested: chunks,
                remaining,
            });
        }

        tx.execute(
            "UPDATE invoices SET chunks_sold = chunks_sold + ?1 WHERE invoice_id = ?2",
            params![chunks, invoice_id.0],
        )?;
        tx.execute(
            "INSERT INTO transactions (invoice_id, buyer_user_id, chunks_purchased, status, purchase_timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                invoice_id.0,
                buyer.0,
                chunks,
                TransactionStatus::PendingActivation.as_str(),
                now_rfc3339(),
            ],
        )?;
        let transaction_id = TransactionId(tx.last_insert_rowid());

        let activated = activate_if_funded(&tx, invoice_id)?;
        let transaction = find_transaction(&tx, transaction_id)?;

        tx.commit()?;

        tracing::info!(
            invoice_id = %invoice_id,
            buyer = %buyer,
            chunks,
            remaining = remaining - chunks,
            activated,
            "chunks purchased"
        );

        Ok(PurchaseOutcome {
            transaction,
            activated,
        })
    }

    /// Purchases against one invoice, newest first.
    pub fn list_transactions_for_invoice(&self, invoice_id: InvoiceId) -> Result<Vec<Transaction>> {
        transactions_where(self.conn(), "invoice_id = ?1", invoice_id.0)
    }

    /// Purchases made by one buyer across all invoices, newest first.
    pub fn list_transactions_for_buyer(&self, buyer: UserId) -> Result<Vec<Transaction>> {
        transactions_where(self.conn(), "buyer_user_id = ?1", buyer.0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_transaction(conn: &Connection, id: TransactionId) -> Result<Transaction> {
    let txn = conn.query_row(
        &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE transaction_id = ?1"),
        params![id.0],
        row_to_transaction,
    )?;
    Ok(txn)
}

fn transactions_where(conn: &Connection, filter: &str, key: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions
         WHERE {filter}
         ORDER BY purchase_timestamp DESC, transaction_id DESC"
    ))?;

    let rows = stmt.query_map(params![key], row_to_transaction)?;

    let mut txns = Vec::new();
    for row in rows {
        txns.push(row?);
    }
    Ok(txns)
}

/// Map a `rusqlite::Row` to a [`Transaction`].
fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let status_str: String = row.get(4)?;
    let ts_str: String = row.get(5)?;

    Ok(Transaction {
        id: TransactionId(row.get(0)?),
        invoice_id: InvoiceId(row.get(1)?),
        buyer: UserId(row.get(2)?),
        chunks_purchased: get_count(row, 3)?,
        status: parse_column(4, &status_str)?,
        purchased_at: parse_timestamp(5, &ts_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewInvoice;
    use chunkfund_shared::types::TransferKind;

    struct Fixture {
        db: Database,
        invoice: InvoiceId,
        alice: UserId,
        bob: UserId,
    }

    /// A 10-chunk invoice and two buyers.
    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner").unwrap();
        let alice = db.create_user("alice").unwrap();
        let bob = db.create_user("bob").unwrap();
        let invoice = db
            .create_invoice(
                owner.id,
                &NewInvoice {
                    debtor_name: "Debtor".into(),
                    original_amount: 1200.0,
                    payment_terms: "Net 30".into(),
                    desired_sale_price: 1000.0,
                },
            )
            .unwrap();
        Fixture {
            db,
            invoice: invoice.id,
            alice: alice.id,
            bob: bob.id,
        }
    }

    #[test]
    fn purchase_records_transaction_and_increments_sold() {
        let mut f = fixture();
        let outcome = f.db.purchase_chunks(f.invoice, f.alice, 3).unwrap();

        assert!(!outcome.activated);
        assert_eq!(outcome.transaction.chunks_purchased, 3);
        assert_eq!(outcome.transaction.status, TransactionStatus::PendingActivation);
        assert_eq!(f.db.get_invoice(f.invoice).unwrap().chunks_sold, 3);
        assert_eq!(f.db.list_transactions_for_buyer(f.alice).unwrap().len(), 1);
    }

    #[test]
    fn final_purchase_activates_in_the_same_write() {
        let mut f = fixture();
        f.db.purchase_chunks(f.invoice, f.alice, 6).unwrap();
        let outcome = f.db.purchase_chunks(f.invoice, f.bob, 4).unwrap();

        assert!(outcome.activated);
        assert_eq!(outcome.transaction.status, TransactionStatus::Active);

        let invoice = f.db.get_invoice(f.invoice).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Active);
        assert_eq!(invoice.chunks_sold, invoice.chunks_total);

        let txns = f.db.list_transactions_for_invoice(f.invoice).unwrap();
        assert_eq!(txns.len(), 2);
        assert!(txns.iter().all(|t| t.status == TransactionStatus::Active));

        let transfers = f.db.list_transfers_for_invoice(f.invoice).unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].kind, TransferKind::Funding);
    }

    #[test]
    fn failed_activation_rolls_back_final_purchase() {
        let mut f = fixture();
        f.db.purchase_chunks(f.invoice, f.alice, 6).unwrap();
        f.db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_funding BEFORE INSERT ON cash_transfers
                 WHEN NEW.event_kind = 'funding'
                 BEGIN SELECT RAISE(ABORT, 'funding rejected'); END;",
            )
            .unwrap();

        let err = f.db.purchase_chunks(f.invoice, f.bob, 4).unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));

        let invoice = f.db.get_invoice(f.invoice).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.chunks_sold, 6);
        assert!(f.db.list_transactions_for_buyer(f.bob).unwrap().is_empty());
        let txns = f.db.list_transactions_for_invoice(f.invoice).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].status, TransactionStatus::PendingActivation);
        assert!(f.db.list_transfers_for_invoice(f.invoice).unwrap().is_empty());
    }

    #[test]
    fn overselling_is_rejected_without_side_effects() {
        let mut f = fixture();
        f.db.purchase_chunks(f.invoice, f.alice, 8).unwrap();

        let err = f.db.purchase_chunks(f.invoice, f.bob, 3).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientChunks { requested: 3, remaining: 2 }
        ));
        assert_eq!(f.db.get_invoice(f.invoice).unwrap().chunks_sold, 8);
        assert!(f.db.list_transactions_for_buyer(f.bob).unwrap().is_empty());
    }

    #[test]
    fn active_invoice_cannot_be_bought() {
        let mut f = fixture();
        f.db.purchase_chunks(f.invoice, f.alice, 10).unwrap();
        let err = f.db.purchase_chunks(f.invoice, f.bob, 1).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidStatus {
                expected: InvoiceStatus::Pending,
                actual: InvoiceStatus::Active,
                ..
            }
        ));
    }

    #[test]
    fn invalid_purchases() {
        let mut f = fixture();
        assert!(matches!(
            f.db.purchase_chunks(f.invoice, f.alice, 0),
            Err(StoreError::InvalidChunkCount)
        ));
        assert!(matches!(
            f.db.purchase_chunks(InvoiceId(999), f.alice, 1),
            Err(StoreError::InvoiceNotFound(_))
        ));
        assert!(matches!(
            f.db.purchase_chunks(f.invoice, UserId(999), 1),
            Err(StoreError::UserNotFound(_))
        ));
    }
}
