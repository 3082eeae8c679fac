//! Over-quota confirmation page.

use super::html::page;
use crate::auth::RequestTenant;
use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;
use axum::Extension;
use axum::extract::State;
use axum::response::{Html, Redirect};

/// GET /db-limit-exceeded
pub async fn limit_exceeded_page() -> Html<String> {
    page(
        "Storage limit reached",
        "<h1>Storage limit reached</h1>\n\
         <p>This demo database has reached its size limit. \
         Wipe it to start over with an empty database.</p>\n\
         <form action=\"/db-limit-exceeded\" method=\"post\">\n\
         <button type=\"submit\">Wipe my data</button>\n</form>",
    )
}

/// POST /db-limit-exceeded - wipe the caller's database.
pub async fn wipe_database(
    State(state): State<AppState>,
    Extension(RequestTenant(tenant)): Extension<RequestTenant>,
) -> ApiResult<Redirect> {
    let result = state.database.recreate(tenant.as_ref()).await;
    metrics::record_recreation("wipe", result.is_ok());
    result?;
    tracing::info!("Tenant database wiped on request");
    Ok(Redirect::to("/"))
}
