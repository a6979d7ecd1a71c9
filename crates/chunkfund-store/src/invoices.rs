//! CRUD operations for [`Invoice`] records.

use rusqlite::{params, Connection, OptionalExtension};

use chunkfund_shared::settlement::{chunks_for_sale_price, validate_amount};
use chunkfund_shared::types::{InvoiceId, InvoiceStatus, UserId};

use crate::database::{get_count, now_rfc3339, parse_column, parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{Invoice, NewInvoice};
use crate::users::find_user;

pub(crate) const INVOICE_COLUMNS: &str = "invoice_id, owner_user_id, debtor_name, original_amount, \
     payment_terms, desired_sale_price, chunks_total, chunks_sold, status, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// List a new invoice for sale.  The sale price is cut into ฿100 chunks.
    pub fn create_invoice(&self, owner: UserId, new: &NewInvoice) -> Result<Invoice> {
        let debtor_name = new.debtor_name.trim();
        if debtor_name.is_empty() {
            return Err(StoreError::InvalidInput("debtor name must not be empty".into()));
        }
        let original_amount = validate_amount("original_amount", new.original_amount)?;
        let chunks_total = chunks_for_sale_price(new.desired_sale_price)?;

        if find_user(self.conn(), owner)?.is_none() {
            return Err(StoreError::UserNotFound(owner));
        }

        self.conn().execute(
            "INSERT INTO invoices (
                owner_user_id, debtor_name, original_amount,
                payment_terms, desired_sale_price, chunks_total, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                owner.0,
                debtor_name,
                original_amount,
                new.payment_terms.trim(),
                new.desired_sale_price,
                chunks_total,
                now_rfc3339(),
            ],
        )?;
        let id = InvoiceId(self.conn().last_insert_rowid());

        tracing::info!(
            invoice_id = %id,
            owner = %owner,
            original_amount,
            chunks_total,
            "invoice created"
        );

        self.get_invoice(id)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_invoice(&self, id: InvoiceId) -> Result<Invoice> {
        find_invoice(self.conn(), id)?.ok_or(StoreError::InvoiceNotFound(id))
    }

    /// Invoices still open for browsing (Pending or Active), newest first.
    pub fn list_open_invoices(&self) -> Result<Vec<Invoice>> {
        let open: Vec<&'static str> = InvoiceStatus::ALL
            .into_iter()
            .filter(InvoiceStatus::is_open)
            .map(|s| s.as_str())
            .collect();
        let placeholders: Vec<String> = (1..=open.len()).map(|i| format!("?{i}")).collect();
        let args: Vec<&dyn rusqlite::ToSql> =
            open.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

        self.query_invoices(
            &format!(
                "SELECT {INVOICE_COLUMNS} FROM invoices
                 WHERE status IN ({})
                 ORDER BY invoice_id DESC",
                placeholders.join(", ")
            ),
            &args,
        )
    }

    /// Every invoice owned by `owner`, newest first.
    pub fn list_invoices_by_owner(&self, owner: UserId) -> Result<Vec<Invoice>> {
        self.query_invoices(
            &format!(
                "SELECT {INVOICE_COLUMNS} FROM invoices
                 WHERE owner_user_id = ?1
                 ORDER BY invoice_id DESC"
            ),
            params![owner.0],
        )
    }

    fn query_invoices(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Invoice>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(args, row_to_invoice)?;

        let mut invoices = Vec::new();
        for row in rows {
            invoices.push(row?);
        }
        Ok(invoices)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn find_invoice(conn: &Connection, id: InvoiceId) -> Result<Option<Invoice>> {
    let invoice = conn
        .query_row(
            &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = ?1"),
            params![id.0],
            row_to_invoice,
        )
        .optional()?;
    Ok(invoice)
}

pub(crate) fn set_invoice_status(
    conn: &Connection,
    id: InvoiceId,
    status: InvoiceStatus,
) -> Result<()> {
    conn.execute(
        "UPDATE invoices SET status = ?1 WHERE invoice_id = ?2",
        params![status.as_str(), id.0],
    )?;
    Ok(())
}

/// Map a `rusqlite::Row` to an [`Invoice`].  Column order is
/// [`INVOICE_COLUMNS`].
pub(crate) fn row_to_invoice(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invoice> {
    let status_str: String = row.get(8)?;
    let created_str: String = row.get(9)?;

    Ok(Invoice {
        id: InvoiceId(row.get(0)?),
        owner: UserId(row.get(1)?),
        debtor_name: row.get(2)?,
        original_amount: row.get(3)?,
        payment_terms: row.get(4)?,
        desired_sale_price: row.get(5)?,
        chunks_total: get_count(row, 6)?,
        chunks_sold: get_count(row, 7)?,
        status: parse_column(8, &status_str)?,
        created_at: parse_timestamp(9, &created_str)?,
    })
}
