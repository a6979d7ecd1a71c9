//! v001 -- Initial schema creation.
//!
//! Creates the four ledger tables: `users`, `invoices`, `transactions`, and
//! `cash_transfers`, plus the triggers that keep invoice status moving
//! forward and the transfer log append-only.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    user_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    username   TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL                       -- RFC-3339
);

-- ----------------------------------------------------------------
-- Invoices
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS invoices (
    invoice_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_user_id      INTEGER NOT NULL,
    debtor_name        TEXT NOT NULL,
    original_amount    REAL NOT NULL,
    payment_terms      TEXT NOT NULL,
    desired_sale_price REAL NOT NULL,
    chunks_total       INTEGER NOT NULL CHECK (chunks_total > 0),
    chunks_sold        INTEGER NOT NULL DEFAULT 0
                       CHECK (chunks_sold >= 0 AND chunks_sold <= chunks_total),
    status             TEXT NOT NULL DEFAULT 'Pending'
                       CHECK (status IN ('Pending', 'Active', 'Paid')),
    created_at         TEXT NOT NULL,

    FOREIGN KEY (owner_user_id) REFERENCES users(user_id)
);

CREATE INDEX IF NOT EXISTS idx_invoices_owner ON invoices(owner_user_id);
CREATE INDEX IF NOT EXISTS idx_invoices_status ON invoices(status);

-- Pending -> Active -> Paid only.
CREATE TRIGGER IF NOT EXISTS trg_invoices_status_forward
BEFORE UPDATE OF status ON invoices
WHEN NEW.status <> OLD.status
 AND NOT ((OLD.status = 'Pending' AND NEW.status = 'Active')
       OR (OLD.status = 'Active'  AND NEW.status = 'Paid'))
BEGIN
    SELECT RAISE(ABORT, 'invoice status can only move forward');
END;

CREATE TRIGGER IF NOT EXISTS trg_invoices_chunks_sold_monotonic
BEFORE UPDATE OF chunks_sold ON invoices
WHEN NEW.chunks_sold < OLD.chunks_sold
BEGIN
    SELECT RAISE(ABORT, 'chunks_sold cannot decrease');
END;

-- ----------------------------------------------------------------
-- Transactions (chunk purchases)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS transactions (
    transaction_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id         INTEGER NOT NULL,
    buyer_user_id      INTEGER NOT NULL,
    chunks_purchased   INTEGER NOT NULL CHECK (chunks_purchased > 0),
    status             TEXT NOT NULL DEFAULT 'Pending Activation'
                       CHECK (status IN ('Pending Activation', 'Active', 'Paid Out')),
    purchase_timestamp TEXT NOT NULL,

    FOREIGN KEY (invoice_id) REFERENCES invoices(invoice_id),
    FOREIGN KEY (buyer_user_id) REFERENCES users(user_id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_invoice ON transactions(invoice_id);
CREATE INDEX IF NOT EXISTS idx_transactions_buyer ON transactions(buyer_user_id);

-- ----------------------------------------------------------------
-- Cash transfers (append-only audit log)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS cash_transfers (
    transfer_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id        INTEGER NOT NULL,
    event_kind        TEXT NOT NULL,
    event_description TEXT NOT NULL,
    amount            REAL NOT NULL,
    from_role         TEXT NOT NULL,
    from_user_id      INTEGER,                     -- NULL for debtor / collective buyers
    to_role           TEXT NOT NULL,
    to_user_id        INTEGER,
    event_timestamp   TEXT NOT NULL,

    FOREIGN KEY (invoice_id) REFERENCES invoices(invoice_id),
    FOREIGN KEY (from_user_id) REFERENCES users(user_id),
    FOREIGN KEY (to_user_id) REFERENCES users(user_id)
);

CREATE INDEX IF NOT EXISTS idx_cash_transfers_invoice
    ON cash_transfers(invoice_id, event_timestamp);

CREATE TRIGGER IF NOT EXISTS trg_cash_transfers_no_update
BEFORE UPDATE ON cash_transfers
BEGIN
    SELECT RAISE(ABORT, 'cash_transfers is append-only');
END;

CREATE TRIGGER IF NOT EXISTS trg_cash_transfers_no_delete
BEFORE DELETE ON cash_transfers
BEGIN
    SELECT RAISE(ABORT, 'cash_transfers is append-only');
END;
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
