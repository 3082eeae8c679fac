//! Recovery from broken or full tenant databases.
//!
//! Handlers never deal with storage failures themselves. Their errors carry a
//! [`StorageFailure`] extension and this layer turns it into a redirect: a
//! rebuilt database plus a retry of the same URL, or the over-quota page.

use crate::auth::RequestTenant;
use crate::error::StorageFailure;
use crate::metrics;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

/// Where over-quota tenants are sent.
pub const LIMIT_EXCEEDED_PATH: &str = "/db-limit-exceeded";

/// Recovery middleware. Runs inside the identity layer.
pub async fn recovery_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let tenant = req
        .extensions()
        .get::<RequestTenant>()
        .cloned()
        .unwrap_or_default()
        .0;
    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());

    let response = next.run(req).await;

    match response.extensions().get::<StorageFailure>().copied() {
        None => response,
        Some(StorageFailure::LimitExceeded) => {
            tracing::info!(path = %target, "Tenant database over quota, redirecting");
            metrics::LIMIT_EXCEEDED_REDIRECTS.inc();
            Redirect::to(LIMIT_EXCEEDED_PATH).into_response()
        }
        Some(StorageFailure::Operational) => {
            tracing::error!(path = %target, "Storage failure while handling request");
            if !state.database.supports_recreate() {
                return response;
            }
            match state.database.recreate(tenant.as_ref()).await {
                Ok(()) => {
                    metrics::record_recreation("operational", true);
                    tracing::info!(path = %target, "Database recreated, retrying request");
                    Redirect::to(&target).into_response()
                }
                Err(e) => {
                    metrics::record_recreation("operational", false);
                    tracing::error!(error = %e, "Database recreation failed");
                    response
                }
            }
        }
    }
}
