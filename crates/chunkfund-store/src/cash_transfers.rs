//! The append-only cash transfer log.
//!
//! Rows are only ever inserted; the schema rejects updates and deletes.
//! Parties are stored as a role column plus an optional user id column.

use rusqlite::{params, Connection};

use chunkfund_shared::format::transfer_description;
use chunkfund_shared::types::{InvoiceId, Party, TransferId, TransferKind, UserId};

use crate::database::{now_rfc3339, parse_column, parse_timestamp, Database};
use crate::error::Result;
use crate::models::{CashTransfer, InvoiceTransfers};

const TRANSFER_COLUMNS: &str = "transfer_id, invoice_id, event_kind, event_description, amount, \
     from_role, from_user_id, to_role, to_user_id, event_timestamp";

impl Database {
    /// Transfers for one invoice, oldest first.
    pub fn list_transfers_for_invoice(&self, invoice_id: InvoiceId) -> Result<Vec<CashTransfer>> {
        transfers_for_invoice(self.conn(), invoice_id)
    }

    /// Every invoice with at least one transfer (newest invoice first), each
    /// with its transfers oldest first.
    pub fn transfer_history(&self) -> Result<Vec<InvoiceTransfers>> {
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT i.invoice_id, i.debtor_name, i.original_amount
             FROM invoices i
             JOIN cash_transfers ct ON i.invoice_id = ct.invoice_id
             ORDER BY i.invoice_id DESC",
        )?;

        let heads = stmt.query_map([], |row| {
            Ok((
                InvoiceId(row.get(0)?),
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut history = Vec::new();
        for head in heads {
            let (invoice_id, debtor_name, original_amount) = head?;
            history.push(InvoiceTransfers {
                invoice_id,
                debtor_name,
                original_amount,
                transfers: transfers_for_invoice(self.conn(), invoice_id)?,
            });
        }
        Ok(history)
    }

    /// Sum of transfer amounts received by `user` (as any party role).
    pub fn total_received_by(&self, user: UserId) -> Result<f64> {
        let total: f64 = self.conn().query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM cash_transfers
             WHERE to_user_id = ?1 AND NOT (from_user_id IS ?1)",
            params![user.0],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Sum of transfer amounts sent by `user` (as any party role).
    pub fn total_sent_by(&self, user: UserId) -> Result<f64> {
        let total: f64 = self.conn().query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM cash_transfers
             WHERE from_user_id = ?1 AND NOT (to_user_id IS ?1)",
            params![user.0],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append one row to the log.  Callers run this inside their own SQL
/// transaction so the transfer commits together with the status change it
/// records.
pub(crate) fn append_transfer(
    conn: &Connection,
    invoice_id: InvoiceId,
    kind: TransferKind,
    amount: f64,
    from: Party,
    to: Party,
) -> Result<CashTransfer> {
    let description = transfer_description(kind, &to);
    let timestamp = now_rfc3339();

    conn.execute(
        "INSERT INTO cash_transfers (
            invoice_id, event_kind, event_description, amount,
            from_role, from_user_id, to_role, to_user_id, event_timestamp
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            invoice_id.0,
            kind.as_str(),
            description,
            amount,
            from.role.as_str(),
            from.user_id.map(|u| u.0),
            to.role.as_str(),
            to.user_id.map(|u| u.0),
            timestamp,
        ],
    )?;

    let id = TransferId(conn.last_insert_rowid());
    tracing::debug!(
        transfer_id = %id,
        invoice_id = %invoice_id,
        kind = kind.as_str(),
        amount,
        "cash transfer recorded"
    );

    Ok(CashTransfer {
        id,
        invoice_id,
        kind,
        description,
        amount,
        from,
        to,
        timestamp: parse_timestamp(9, &timestamp)?,
    })
}

pub(crate) fn transfers_for_invoice(
    conn: &Connection,
    invoice_id: InvoiceId,
) -> Result<Vec<CashTransfer>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSFER_COLUMNS} FROM cash_transfers
         WHERE invoice_id = ?1
         ORDER BY event_timestamp ASC, transfer_id ASC"
    ))?;

    let rows = stmt.query_map(params![invoice_id.0], row_to_transfer)?;

    let mut transfers = Vec::new();
    for row in rows {
        transfers.push(row?);
    }
    Ok(transfers)
}

/// Map a `rusqlite::Row` to a [`CashTransfer`].
fn row_to_transfer(row: &rusqlite::Row<'_>) -> rusqlite::Result<CashTransfer> {
    let kind_str: String = row.get(2)?;
    let from_role: String = row.get(5)?;
    let from_user: Option<i64> = row.get(6)?;
    let to_role: String = row.get(7)?;
    let to_user: Option<i64> = row.get(8)?;
    let ts_str: String = row.get(9)?;

    Ok(CashTransfer {
        id: TransferId(row.get(0)?),
        invoice_id: InvoiceId(row.get(1)?),
        kind: parse_column::<TransferKind>(2, &kind_str)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        from: Party {
            role: parse_column(5, &from_role)?,
            user_id: from_user.map(UserId),
        },
        to: Party {
            role: parse_column(7, &to_role)?,
            user_id: to_user.map(UserId),
        },
        timestamp: parse_timestamp(9, &ts_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewInvoice;

    fn setup() -> (Database, UserId, InvoiceId) {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner").unwrap();
        let invoice = db
            .create_invoice(
                owner.id,
                &NewInvoice {
                    debtor_name: "Debtor Ltd".into(),
                    original_amount: 1000.0,
                    payment_terms: "Net 60".into(),
                    desired_sale_price: 900.0,
                },
            )
            .unwrap();
        (db, owner.id, invoice.id)
    }

    #[test]
    fn appended_transfer_reads_back_with_typed_parties() {
        let (db, owner, invoice) = setup();
        let written = append_transfer(
            db.conn(),
            invoice,
            TransferKind::DebtorPayment,
            1000.0,
            Party::debtor(),
            Party::invoice_owner(owner),
        )
        .unwrap();

        let read = db.list_transfers_for_invoice(invoice).unwrap();
        assert_eq!(read, vec![written]);
        assert_eq!(read[0].from_label(), "Debtor");
        assert_eq!(read[0].to_label(), format!("Invoice Owner (User {owner})"));
    }

    #[test]
    fn log_is_append_only() {
        let (db, owner, invoice) = setup();
        append_transfer(
            db.conn(),
            invoice,
            TransferKind::Funding,
            900.0,
            Party::collective_buyers(),
            Party::invoice_owner(owner),
        )
        .unwrap();

        assert!(db
            .conn()
            .execute("UPDATE cash_transfers SET amount = 0", [])
            .is_err());
        assert!(db.conn().execute("DELETE FROM cash_transfers", []).is_err());
        assert_eq!(db.list_transfers_for_invoice(invoice).unwrap().len(), 1);
    }

    #[test]
    fn history_groups_by_invoice() {
        let (db, owner, invoice) = setup();
        assert!(db.transfer_history().unwrap().is_empty());

        for kind in [TransferKind::Funding, TransferKind::DebtorPayment] {
            append_transfer(
                db.conn(),
                invoice,
                kind,
                10.0,
                Party::debtor(),
                Party::invoice_owner(owner),
            )
            .unwrap();
        }

        let history = db.transfer_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].debtor_name, "Debtor Ltd");
        assert_eq!(history[0].transfers.len(), 2);
        assert_eq!(history[0].transfers[0].kind, TransferKind::Funding);
    }

    #[test]
    fn self_transfers_do_not_count_as_cash_flow() {
        let (db, owner, invoice) = setup();
        append_transfer(
            db.conn(),
            invoice,
            TransferKind::DebtorPayment,
            1000.0,
            Party::debtor(),
            Party::invoice_owner(owner),
        )
        .unwrap();
        append_transfer(
            db.conn(),
            invoice,
            TransferKind::OwnerResidual,
            50.0,
            Party::invoice_owner(owner),
            Party::invoice_owner(owner),
        )
        .unwrap();

        assert_eq!(db.total_received_by(owner).unwrap(), 1000.0);
        assert_eq!(db.total_sent_by(owner).unwrap(), 0.0);
    }
}
