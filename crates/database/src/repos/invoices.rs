//! Invoice repository.

use crate::error::{DbError, DbResult};
use crate::models::{AdjustmentKind, AdjustmentRow, InvoiceDetail, InvoiceRow, LineItemRow};
use crate::session::DbSession;
use async_trait::async_trait;
use rust_decimal::Decimal;
use time::Date;

/// Repository for invoices and their entries.
#[async_trait]
pub trait InvoiceRepo: Send {
    /// Invoices of a project, newest first.
    async fn list_invoices(&mut self, project_id: i64) -> DbResult<Vec<InvoiceRow>>;

    async fn get_invoice(&mut self, project_id: i64, invoice_id: i64) -> DbResult<Option<InvoiceRow>>;

    async fn create_invoice(&mut self, project_id: i64, name: &str) -> DbResult<InvoiceRow>;

    /// Load an invoice with its line items, credits and reimbursements.
    async fn invoice_detail(
        &mut self,
        project_id: i64,
        invoice_id: i64,
    ) -> DbResult<Option<InvoiceDetail>>;

    /// Bill a deliverable of the same project at its estimate.
    async fn add_line_item(
        &mut self,
        project_id: i64,
        invoice_id: i64,
        deliverable_id: i64,
    ) -> DbResult<LineItemRow>;

    async fn remove_line_item(&mut self, invoice_id: i64, line_item_id: i64) -> DbResult<()>;

    async fn add_adjustment(
        &mut self,
        invoice_id: i64,
        kind: AdjustmentKind,
        reason: &str,
        amount: Decimal,
    ) -> DbResult<AdjustmentRow>;

    async fn remove_adjustment(
        &mut self,
        invoice_id: i64,
        kind: AdjustmentKind,
        adjustment_id: i64,
    ) -> DbResult<()>;

    /// Set or clear the sent date.
    async fn set_sent(&mut self, invoice_id: i64, sent: Option<Date>) -> DbResult<()>;

    /// Set or clear the paid date.
    async fn set_paid(&mut self, invoice_id: i64, paid: Option<Date>) -> DbResult<()>;
}

impl DbSession {
    async fn line_items(&mut self, invoice_id: i64) -> DbResult<Vec<LineItemRow>> {
        let rows = sqlx::query_as::<_, LineItemRow>(
            "SELECT li.id, li.invoice_id, li.deliverable_id, d.name AS deliverable_name, li.amount \
             FROM invoice_line_item li JOIN deliverable d ON d.id = li.deliverable_id \
             WHERE li.invoice_id = ? ORDER BY li.id",
        )
        .bind(invoice_id)
        .fetch_all(self.conn())
        .await?;
        Ok(rows)
    }

    async fn adjustments(
        &mut self,
        invoice_id: i64,
        kind: AdjustmentKind,
    ) -> DbResult<Vec<AdjustmentRow>> {
        let rows = sqlx::query_as::<_, AdjustmentRow>(&format!(
            "SELECT * FROM {} WHERE invoice_id = ? ORDER BY id",
            kind.table()
        ))
        .bind(invoice_id)
        .fetch_all(self.conn())
        .await?;
        Ok(rows)
    }

    async fn set_date(&mut self, invoice_id: i64, column: &str, value: Option<Date>) -> DbResult<()> {
        let result = sqlx::query(&format!("UPDATE invoice SET {column} = ? WHERE id = ?"))
            .bind(value)
            .bind(invoice_id)
            .execute(self.conn())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("invoice {invoice_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl InvoiceRepo for DbSession {
    async fn list_invoices(&mut self, project_id: i64) -> DbResult<Vec<InvoiceRow>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(
            "SELECT * FROM invoice WHERE project_id = ? ORDER BY id DESC",
        )
        .bind(project_id)
        .fetch_all(self.conn())
        .await?;
        Ok(rows)
    }

    async fn get_invoice(&mut self, project_id: i64, invoice_id: i64) -> DbResult<Option<InvoiceRow>> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            "SELECT * FROM invoice WHERE project_id = ? AND id = ?",
        )
        .bind(project_id)
        .bind(invoice_id)
        .fetch_optional(self.conn())
        .await?;
        Ok(row)
    }

    async fn create_invoice(&mut self, project_id: i64, name: &str) -> DbResult<InvoiceRow> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            "INSERT INTO invoice (project_id, name) VALUES (?, ?) RETURNING *",
        )
        .bind(project_id)
        .bind(name)
        .fetch_one(self.conn())
        .await?;
        Ok(row)
    }

    async fn invoice_detail(
        &mut self,
        project_id: i64,
        invoice_id: i64,
    ) -> DbResult<Option<InvoiceDetail>> {
        let Some(invoice) = self.get_invoice(project_id, invoice_id).await? else {
            return Ok(None);
        };
        let line_items = self.line_items(invoice.id).await?;
        let credits = self.adjustments(invoice.id, AdjustmentKind::Credit).await?;
        let reimbursements = self
            .adjustments(invoice.id, AdjustmentKind::Reimbursement)
            .await?;
        Ok(Some(InvoiceDetail {
            invoice,
            line_items,
            credits,
            reimbursements,
        }))
    }

    async fn add_line_item(
        &mut self,
        project_id: i64,
        invoice_id: i64,
        deliverable_id: i64,
    ) -> DbResult<LineItemRow> {
        if self.get_invoice(project_id, invoice_id).await?.is_none() {
            return Err(DbError::NotFound(format!("invoice {invoice_id}")));
        }
        let deliverable: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT name, estimate FROM deliverable WHERE id = ? AND project_id = ?",
        )
        .bind(deliverable_id)
        .bind(project_id)
        .fetch_optional(self.conn())
        .await?;
        let (deliverable_name, estimate) =
            deliverable.ok_or_else(|| DbError::NotFound(format!("deliverable {deliverable_id}")))?;

        let amount = match estimate {
            Some(text) => text
                .parse::<Decimal>()
                .map_err(|e| DbError::InvalidValue(format!("estimate {text:?}: {e}")))?,
            None => Decimal::ZERO,
        };

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO invoice_line_item (invoice_id, deliverable_id, amount) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(invoice_id)
        .bind(deliverable_id)
        .bind(amount.to_string())
        .fetch_one(self.conn())
        .await?;

        Ok(LineItemRow {
            id,
            invoice_id,
            deliverable_id,
            deliverable_name,
            amount,
        })
    }

    async fn remove_line_item(&mut self, invoice_id: i64, line_item_id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM invoice_line_item WHERE id = ? AND invoice_id = ?")
            .bind(line_item_id)
            .bind(invoice_id)
            .execute(self.conn())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("line item {line_item_id}")));
        }
        Ok(())
    }

    async fn add_adjustment(
        &mut self,
        invoice_id: i64,
        kind: AdjustmentKind,
        reason: &str,
        amount: Decimal,
    ) -> DbResult<AdjustmentRow> {
        let id: i64 = sqlx::query_scalar(&format!(
            "INSERT INTO {} (invoice_id, reason, amount) VALUES (?, ?, ?) RETURNING id",
            kind.table()
        ))
        .bind(invoice_id)
        .bind(reason)
        .bind(amount.to_string())
        .fetch_one(self.conn())
        .await?;

        Ok(AdjustmentRow {
            id,
            invoice_id,
            reason: reason.to_string(),
            amount,
        })
    }

    async fn remove_adjustment(
        &mut self,
        invoice_id: i64,
        kind: AdjustmentKind,
        adjustment_id: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = ? AND invoice_id = ?",
            kind.table()
        ))
        .bind(adjustment_id)
        .bind(invoice_id)
        .execute(self.conn())
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!(
                "{} {adjustment_id}",
                kind.as_str()
            )));
        }
        Ok(())
    }

    async fn set_sent(&mut self, invoice_id: i64, sent: Option<Date>) -> DbResult<()> {
        self.set_date(invoice_id, "sent", sent).await
    }

    async fn set_paid(&mut self, invoice_id: i64, paid: Option<Date>) -> DbResult<()> {
        self.set_date(invoice_id, "paid", paid).await
    }
}
