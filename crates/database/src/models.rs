//! Row types for the tenant schema.
//!
//! Amounts are stored as decimal text, so rows holding money implement
//! `FromRow` by hand and parse the column into a `Decimal`.

use invoicer_core::InvoiceTotals;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use time::{Date, OffsetDateTime};

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let text: String = row.try_get(column)?;
    text.parse::<Decimal>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}

fn optional_decimal_column(row: &SqliteRow, column: &str) -> Result<Option<Decimal>, sqlx::Error> {
    match row.try_get::<Option<String>, _>(column)? {
        Some(_) => decimal_column(row, column).map(Some),
        None => Ok(None),
    }
}

// =============================================================================
// Projects
// =============================================================================

/// Client contact printed on invoices.
#[derive(Debug, Clone, FromRow)]
pub struct BillToRow {
    pub id: i64,
    pub company_name: String,
    pub contact_name: String,
    pub contact_email: String,
}

/// Contact details submitted from the project page.
#[derive(Debug, Clone)]
pub struct NewBillTo {
    pub company_name: String,
    pub contact_name: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub bill_to_id: Option<i64>,
}

// =============================================================================
// Deliverables
// =============================================================================

/// A unit of work, with its billing state derived from line items.
#[derive(Debug, Clone)]
pub struct DeliverableRow {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub estimate: Option<Decimal>,
    pub created: OffsetDateTime,
    pub due_date: Option<Date>,
    /// Whether a line item bills this deliverable.
    pub invoiced: bool,
    /// Whether the invoice billing it has a paid date.
    pub paid: bool,
}

impl<'r> FromRow<'r, SqliteRow> for DeliverableRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            project_id: row.try_get("project_id")?,
            name: row.try_get("name")?,
            estimate: optional_decimal_column(row, "estimate")?,
            created: row.try_get("created")?,
            due_date: row.try_get("due_date")?,
            invoiced: row.try_get("invoiced")?,
            paid: row.try_get("paid")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewDeliverable {
    pub name: String,
    pub estimate: Option<Decimal>,
    pub due_date: Option<Date>,
}

// =============================================================================
// Invoices
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub sent: Option<Date>,
    pub paid: Option<Date>,
}

/// A deliverable billed on an invoice.
#[derive(Debug, Clone)]
pub struct LineItemRow {
    pub id: i64,
    pub invoice_id: i64,
    pub deliverable_id: i64,
    pub deliverable_name: String,
    pub amount: Decimal,
}

impl<'r> FromRow<'r, SqliteRow> for LineItemRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            invoice_id: row.try_get("invoice_id")?,
            deliverable_id: row.try_get("deliverable_id")?,
            deliverable_name: row.try_get("deliverable_name")?,
            amount: decimal_column(row, "amount")?,
        })
    }
}

/// Free-form invoice entries that are not tied to a deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentKind {
    /// Subtracted from the balance.
    Credit,
    /// Added to the balance but excluded from net pay.
    Reimbursement,
}

impl AdjustmentKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Credit => "invoice_credit",
            Self::Reimbursement => "invoice_reimbursement",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Reimbursement => "reimbursement",
        }
    }
}

/// A credit or reimbursement row.
#[derive(Debug, Clone)]
pub struct AdjustmentRow {
    pub id: i64,
    pub invoice_id: i64,
    pub reason: String,
    pub amount: Decimal,
}

impl<'r> FromRow<'r, SqliteRow> for AdjustmentRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            invoice_id: row.try_get("invoice_id")?,
            reason: row.try_get("reason")?,
            amount: decimal_column(row, "amount")?,
        })
    }
}

/// An invoice with every entry loaded.
#[derive(Debug, Clone)]
pub struct InvoiceDetail {
    pub invoice: InvoiceRow,
    pub line_items: Vec<LineItemRow>,
    pub credits: Vec<AdjustmentRow>,
    pub reimbursements: Vec<AdjustmentRow>,
}

impl InvoiceDetail {
    pub fn totals(&self) -> InvoiceTotals {
        let line_items: Vec<Decimal> = self.line_items.iter().map(|i| i.amount).collect();
        let credits: Vec<Decimal> = self.credits.iter().map(|c| c.amount).collect();
        let reimbursements: Vec<Decimal> = self.reimbursements.iter().map(|r| r.amount).collect();
        InvoiceTotals::compute(&line_items, &credits, &reimbursements)
    }
}
