//! Deliverable repository.

use crate::error::{DbError, DbResult};
use crate::models::{DeliverableRow, NewDeliverable};
use crate::session::DbSession;
use async_trait::async_trait;
use time::OffsetDateTime;

// Billing state comes from the line item (if any) and its invoice.
const SELECT_DELIVERABLE: &str = "\
SELECT d.id, d.project_id, d.name, d.estimate, d.created, d.due_date,
       li.id IS NOT NULL AS invoiced,
       i.paid IS NOT NULL AS paid
FROM deliverable d
LEFT JOIN invoice_line_item li ON li.deliverable_id = d.id
LEFT JOIN invoice i ON i.id = li.invoice_id";

/// Repository for a project's deliverables.
#[async_trait]
pub trait DeliverableRepo: Send {
    /// Deliverables of a project, newest first.
    async fn list_deliverables(&mut self, project_id: i64) -> DbResult<Vec<DeliverableRow>>;

    /// Deliverables not yet billed on any invoice, newest first.
    async fn list_uninvoiced_deliverables(&mut self, project_id: i64) -> DbResult<Vec<DeliverableRow>>;

    async fn get_deliverable(
        &mut self,
        project_id: i64,
        deliverable_id: i64,
    ) -> DbResult<Option<DeliverableRow>>;

    async fn create_deliverable(
        &mut self,
        project_id: i64,
        deliverable: &NewDeliverable,
    ) -> DbResult<DeliverableRow>;

    /// Delete a deliverable. Fails with a constraint violation while it is
    /// billed on an invoice.
    async fn delete_deliverable(&mut self, project_id: i64, deliverable_id: i64) -> DbResult<()>;
}

#[async_trait]
impl DeliverableRepo for DbSession {
    async fn list_deliverables(&mut self, project_id: i64) -> DbResult<Vec<DeliverableRow>> {
        let rows = sqlx::query_as::<_, DeliverableRow>(&format!(
            "{SELECT_DELIVERABLE} WHERE d.project_id = ? ORDER BY d.created DESC, d.id DESC"
        ))
        .bind(project_id)
        .fetch_all(self.conn())
        .await?;
        Ok(rows)
    }

    async fn list_uninvoiced_deliverables(&mut self, project_id: i64) -> DbResult<Vec<DeliverableRow>> {
        let rows = sqlx::query_as::<_, DeliverableRow>(&format!(
            "{SELECT_DELIVERABLE} WHERE d.project_id = ? AND li.id IS NULL \
             ORDER BY d.created DESC, d.id DESC"
        ))
        .bind(project_id)
        .fetch_all(self.conn())
        .await?;
        Ok(rows)
    }

    async fn get_deliverable(
        &mut self,
        project_id: i64,
        deliverable_id: i64,
    ) -> DbResult<Option<DeliverableRow>> {
        let row = sqlx::query_as::<_, DeliverableRow>(&format!(
            "{SELECT_DELIVERABLE} WHERE d.project_id = ? AND d.id = ?"
        ))
        .bind(project_id)
        .bind(deliverable_id)
        .fetch_optional(self.conn())
        .await?;
        Ok(row)
    }

    async fn create_deliverable(
        &mut self,
        project_id: i64,
        deliverable: &NewDeliverable,
    ) -> DbResult<DeliverableRow> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO deliverable (project_id, name, estimate, created, due_date) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(project_id)
        .bind(&deliverable.name)
        .bind(deliverable.estimate.map(|e| e.to_string()))
        .bind(OffsetDateTime::now_utc())
        .bind(deliverable.due_date)
        .fetch_one(self.conn())
        .await?;

        self.get_deliverable(project_id, id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("deliverable {id}")))
    }

    async fn delete_deliverable(&mut self, project_id: i64, deliverable_id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM deliverable WHERE id = ? AND project_id = ?")
            .bind(deliverable_id)
            .bind(project_id)
            .execute(self.conn())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("deliverable {deliverable_id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticDatabase;
    use crate::proxy::DatabaseProxy;
    use crate::repos::{InvoiceRepo, ProjectRepo};
    use rust_decimal::Decimal;
    use tempfile::tempdir;
    use time::macros::date;

    fn new_deliverable(name: &str, cents: i64) -> NewDeliverable {
        NewDeliverable {
            name: name.to_string(),
            estimate: Some(Decimal::new(cents, 2)),
            due_date: Some(date!(2024 - 03 - 01)),
        }
    }

    #[tokio::test]
    async fn test_deliverable_lifecycle() {
        let temp = tempdir().unwrap();
        let db = StaticDatabase::open(temp.path().join("d.db")).await.unwrap();
        let mut session = db.session(None).await.unwrap();
        let project = session.create_project("Site").await.unwrap();

        let first = session
            .create_deliverable(project.id, &new_deliverable("Wireframes", 125050))
            .await
            .unwrap();
        let second = session
            .create_deliverable(project.id, &new_deliverable("Build", 300000))
            .await
            .unwrap();
        assert_eq!(first.estimate, Some(Decimal::new(125050, 2)));
        assert_eq!(first.due_date, Some(date!(2024 - 03 - 01)));
        assert!(!first.invoiced);
        assert!(!first.paid);

        let ids: Vec<_> = session
            .list_deliverables(project.id)
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, [second.id, first.id]);

        session.delete_deliverable(project.id, first.id).await.unwrap();
        assert!(session.get_deliverable(project.id, first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_billing_state_follows_invoice() {
        let temp = tempdir().unwrap();
        let db = StaticDatabase::open(temp.path().join("d.db")).await.unwrap();
        let mut session = db.session(None).await.unwrap();
        let project = session.create_project("Billing").await.unwrap();
        let billed = session
            .create_deliverable(project.id, &new_deliverable("Billed", 1000))
            .await
            .unwrap();
        let open = session
            .create_deliverable(project.id, &new_deliverable("Open", 2000))
            .await
            .unwrap();

        let invoice = session.create_invoice(project.id, "INV-7").await.unwrap();
        session
            .add_line_item(project.id, invoice.id, billed.id)
            .await
            .unwrap();

        let uninvoiced = session.list_uninvoiced_deliverables(project.id).await.unwrap();
        assert_eq!(uninvoiced.len(), 1);
        assert_eq!(uninvoiced[0].id, open.id);

        let row = session.get_deliverable(project.id, billed.id).await.unwrap().unwrap();
        assert!(row.invoiced);
        assert!(!row.paid);

        session
            .set_paid(invoice.id, Some(date!(2024 - 04 - 15)))
            .await
            .unwrap();
        let row = session.get_deliverable(project.id, billed.id).await.unwrap().unwrap();
        assert!(row.paid);

        let err = session
            .delete_deliverable(project.id, billed.id)
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_deliverable_scoped_to_project() {
        let temp = tempdir().unwrap();
        let db = StaticDatabase::open(temp.path().join("d.db")).await.unwrap();
        let mut session = db.session(None).await.unwrap();
        let a = session.create_project("A").await.unwrap();
        let b = session.create_project("B").await.unwrap();
        let d = session
            .create_deliverable(a.id, &new_deliverable("Only in A", 100))
            .await
            .unwrap();

        assert!(session.get_deliverable(b.id, d.id).await.unwrap().is_none());
        assert!(matches!(
            session.delete_deliverable(b.id, d.id).await,
            Err(DbError::NotFound(_))
        ));
    }
}
