//! Tenant database schema.
//!
//! Every statement is idempotent so two first requests racing on the same
//! fresh file both succeed.

use crate::error::DbResult;
use sqlx::SqlitePool;

/// Application tables, parents before children.
pub const TABLES: &[&str] = &[
    "bill_to",
    "project",
    "deliverable",
    "invoice",
    "invoice_line_item",
    "invoice_credit",
    "invoice_reimbursement",
];

/// Create every table and index that does not exist yet.
pub async fn apply(pool: &SqlitePool) -> DbResult<()> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

/// Drop every application table, children first.
pub async fn drop_all(pool: &SqlitePool) -> DbResult<()> {
    for table in TABLES.iter().rev() {
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Rebuild the file to reclaim pages freed by deletes and drops.
pub async fn compact(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query("VACUUM").execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bill_to (
    id INTEGER PRIMARY KEY,
    company_name TEXT NOT NULL,
    contact_name TEXT NOT NULL,
    contact_email TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    bill_to_id INTEGER REFERENCES bill_to(id)
);
CREATE UNIQUE INDEX IF NOT EXISTS ix_project_name ON project(name);

CREATE TABLE IF NOT EXISTS deliverable (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES project(id),
    name TEXT NOT NULL,
    -- decimal text, e.g. '1250.00'
    estimate TEXT,
    created TEXT NOT NULL,
    due_date TEXT
);
CREATE INDEX IF NOT EXISTS ix_deliverable_project ON deliverable(project_id);

CREATE TABLE IF NOT EXISTS invoice (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES project(id),
    name TEXT NOT NULL,
    sent TEXT,
    paid TEXT
);
CREATE INDEX IF NOT EXISTS ix_invoice_project ON invoice(project_id);

-- A deliverable can be billed on at most one invoice.
CREATE TABLE IF NOT EXISTS invoice_line_item (
    id INTEGER PRIMARY KEY,
    invoice_id INTEGER NOT NULL REFERENCES invoice(id),
    deliverable_id INTEGER NOT NULL UNIQUE REFERENCES deliverable(id),
    amount TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_invoice_line_item_invoice ON invoice_line_item(invoice_id);

CREATE TABLE IF NOT EXISTS invoice_credit (
    id INTEGER PRIMARY KEY,
    invoice_id INTEGER NOT NULL REFERENCES invoice(id),
    reason TEXT NOT NULL,
    amount TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_invoice_credit_invoice ON invoice_credit(invoice_id);

CREATE TABLE IF NOT EXISTS invoice_reimbursement (
    id INTEGER PRIMARY KEY,
    invoice_id INTEGER NOT NULL REFERENCES invoice(id),
    reason TEXT NOT NULL,
    amount TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_invoice_reimbursement_invoice ON invoice_reimbursement(invoice_id);
"#;
