//! Project and bill-to repository.

use crate::error::{DbError, DbResult};
use crate::models::{BillToRow, NewBillTo, ProjectRow};
use crate::session::DbSession;
use async_trait::async_trait;
use sqlx::Connection;

/// Repository for projects and their billing contact.
#[async_trait]
pub trait ProjectRepo: Send {
    /// All projects, by name.
    async fn list_projects(&mut self) -> DbResult<Vec<ProjectRow>>;

    async fn get_project(&mut self, project_id: i64) -> DbResult<Option<ProjectRow>>;

    /// Create a project. Names are unique.
    async fn create_project(&mut self, name: &str) -> DbResult<ProjectRow>;

    /// Delete a project with its deliverables, invoices and invoice entries.
    async fn delete_project(&mut self, project_id: i64) -> DbResult<()>;

    async fn get_bill_to(&mut self, project_id: i64) -> DbResult<Option<BillToRow>>;

    /// Create the project's contact, or overwrite it if one is set.
    async fn upsert_bill_to(&mut self, project_id: i64, bill_to: &NewBillTo) -> DbResult<BillToRow>;
}

#[async_trait]
impl ProjectRepo for DbSession {
    async fn list_projects(&mut self) -> DbResult<Vec<ProjectRow>> {
        let rows = sqlx::query_as::<_, ProjectRow>("SELECT * FROM project ORDER BY name, id")
            .fetch_all(self.conn())
            .await?;
        Ok(rows)
    }

    async fn get_project(&mut self, project_id: i64) -> DbResult<Option<ProjectRow>> {
        let row = sqlx::query_as::<_, ProjectRow>("SELECT * FROM project WHERE id = ?")
            .bind(project_id)
            .fetch_optional(self.conn())
            .await?;
        Ok(row)
    }

    async fn create_project(&mut self, name: &str) -> DbResult<ProjectRow> {
        let row = sqlx::query_as::<_, ProjectRow>(
            "INSERT INTO project (name) VALUES (?) RETURNING *",
        )
        .bind(name)
        .fetch_one(self.conn())
        .await?;
        Ok(row)
    }

    async fn delete_project(&mut self, project_id: i64) -> DbResult<()> {
        let mut tx = self.conn().begin().await?;

        for table in ["invoice_line_item", "invoice_credit", "invoice_reimbursement"] {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE invoice_id IN (SELECT id FROM invoice WHERE project_id = ?)"
            ))
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("DELETE FROM invoice WHERE project_id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM deliverable WHERE project_id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM project WHERE id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("project {project_id}")));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_bill_to(&mut self, project_id: i64) -> DbResult<Option<BillToRow>> {
        let row = sqlx::query_as::<_, BillToRow>(
            "SELECT b.* FROM bill_to b JOIN project p ON p.bill_to_id = b.id WHERE p.id = ?",
        )
        .bind(project_id)
        .fetch_optional(self.conn())
        .await?;
        Ok(row)
    }

    async fn upsert_bill_to(&mut self, project_id: i64, bill_to: &NewBillTo) -> DbResult<BillToRow> {
        let mut tx = self.conn().begin().await?;

        let existing: Option<Option<i64>> =
            sqlx::query_scalar("SELECT bill_to_id FROM project WHERE id = ?")
                .bind(project_id)
                .fetch_optional(&mut *tx)
                .await?;
        let existing = existing.ok_or_else(|| DbError::NotFound(format!("project {project_id}")))?;

        let row = match existing {
            Some(bill_to_id) => {
                sqlx::query_as::<_, BillToRow>(
                    "UPDATE bill_to SET company_name = ?, contact_name = ?, contact_email = ? WHERE id = ? RETURNING *",
                )
                .bind(&bill_to.company_name)
                .bind(&bill_to.contact_name)
                .bind(&bill_to.contact_email)
                .bind(bill_to_id)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                let row = sqlx::query_as::<_, BillToRow>(
                    "INSERT INTO bill_to (company_name, contact_name, contact_email) VALUES (?, ?, ?) RETURNING *",
                )
                .bind(&bill_to.company_name)
                .bind(&bill_to.contact_name)
                .bind(&bill_to.contact_email)
                .fetch_one(&mut *tx)
                .await?;
                sqlx::query("UPDATE project SET bill_to_id = ? WHERE id = ?")
                    .bind(row.id)
                    .bind(project_id)
                    .execute(&mut *tx)
                    .await?;
                row
            }
        };

        tx.commit().await?;
        Ok(row)
    }
}
