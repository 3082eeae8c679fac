//! Deliverable form handlers.

use super::common::{TenantDb, optional_amount, optional_date, required, to_project};
use crate::error::{ApiError, ApiResult};
use axum::Form;
use axum::extract::Path;
use axum::response::Redirect;
use invoicer_database::models::NewDeliverable;
use invoicer_database::repos::{DeliverableRepo, ProjectRepo};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DeliverableForm {
    pub name: String,
    #[serde(default)]
    pub estimate: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

/// POST /project/{project_id}/deliverable
pub async fn create_deliverable(
    mut db: TenantDb,
    Path(project_id): Path<i64>,
    Form(form): Form<DeliverableForm>,
) -> ApiResult<Redirect> {
    if db.get_project(project_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("project {project_id}")));
    }
    let deliverable = NewDeliverable {
        name: required("name", &form.name)?.to_string(),
        estimate: optional_amount(form.estimate.as_deref())?,
        due_date: optional_date("due_date", form.due_date.as_deref())?,
    };
    db.create_deliverable(project_id, &deliverable).await?;
    Ok(to_project(project_id))
}

/// POST /project/{project_id}/deliverable/{deliverable_id}/delete
pub async fn delete_deliverable(
    mut db: TenantDb,
    Path((project_id, deliverable_id)): Path<(i64, i64)>,
) -> ApiResult<Redirect> {
    db.delete_deliverable(project_id, deliverable_id).await?;
    Ok(to_project(project_id))
}
