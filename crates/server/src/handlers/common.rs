//! Shared handler helpers.

use crate::auth::RequestTenant;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Redirect;
use invoicer_database::DbSession;
use rust_decimal::Decimal;
use std::ops::{Deref, DerefMut};
use time::Date;
use time::macros::format_description;

/// Database session for the calling tenant, released when the handler returns.
pub struct TenantDb(pub DbSession);

impl FromRequestParts<AppState> for TenantDb {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let tenant = parts
            .extensions
            .get::<RequestTenant>()
            .and_then(|t| t.0.clone());
        let session = state.database.session(tenant.as_ref()).await?;
        metrics::DATABASE_SESSIONS.inc();
        Ok(Self(session))
    }
}

impl Deref for TenantDb {
    type Target = DbSession;

    fn deref(&self) -> &DbSession {
        &self.0
    }
}

impl DerefMut for TenantDb {
    fn deref_mut(&mut self) -> &mut DbSession {
        &mut self.0
    }
}

/// Redirect back to a project's page.
pub fn to_project(project_id: i64) -> Redirect {
    Redirect::to(&format!("/projects/{project_id}"))
}

/// Reject blank form fields.
pub fn required<'a>(field: &str, value: &'a str) -> ApiResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(value)
}

/// Parse an optional amount; blank means absent.
pub fn optional_amount(value: Option<&str>) -> ApiResult<Option<Decimal>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => Ok(Some(invoicer_core::parse_amount(v)?)),
    }
}

/// Parse an optional `YYYY-MM-DD` date; blank means absent.
pub fn optional_date(field: &str, value: Option<&str>) -> ApiResult<Option<Date>> {
    let format = format_description!("[year]-[month]-[day]");
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => Date::parse(v, &format)
            .map(Some)
            .map_err(|e| ApiError::BadRequest(format!("{field}: {e}"))),
    }
}
