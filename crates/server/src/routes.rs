//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::metrics::{metrics_handler, register_metrics};
use crate::recovery::{LIMIT_EXCEEDED_PATH, recovery_middleware};
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    register_metrics();

    let mut app_routes = Router::new()
        // Projects
        .route("/", get(handlers::index))
        .route(
            "/projects",
            get(handlers::new_project).post(handlers::create_project),
        )
        .route("/projects/{id}", get(handlers::project_detail))
        .route("/projects/{id}/delete", post(handlers::delete_project))
        .route(
            "/project/{project_id}/contact",
            post(handlers::update_contact),
        )
        // Deliverables
        .route(
            "/project/{project_id}/deliverable",
            post(handlers::create_deliverable),
        )
        .route(
            "/project/{project_id}/deliverable/{deliverable_id}/delete",
            post(handlers::delete_deliverable),
        )
        // Invoices
        .route(
            "/project/{project_id}/invoice",
            post(handlers::create_invoice),
        )
        .route(
            "/project/{project_id}/invoice/{invoice_id}/line_items",
            post(handlers::add_line_item),
        )
        .route(
            "/project/{project_id}/invoice/{invoice_id}/line_items/{line_item_id}",
            post(handlers::remove_line_item),
        )
        .route(
            "/project/{project_id}/invoice/{invoice_id}/credit",
            post(handlers::add_credit),
        )
        .route(
            "/project/{project_id}/invoice/{invoice_id}/credit/{credit_id}",
            post(handlers::remove_credit),
        )
        .route(
            "/project/{project_id}/invoice/{invoice_id}/reimbursement",
            post(handlers::add_reimbursement),
        )
        .route(
            "/project/{project_id}/invoice/{invoice_id}/reimbursement/{reimbursement_id}",
            post(handlers::remove_reimbursement),
        )
        .route(
            "/project/{project_id}/invoice/{invoice_id}/sent",
            post(handlers::mark_sent),
        )
        .route(
            "/project/{project_id}/invoice/{invoice_id}/paid",
            post(handlers::mark_paid),
        )
        .route(
            "/project/{project_id}/invoice/{invoice_id}/render",
            get(handlers::render_invoice),
        )
        // Quota recovery
        .route(
            LIMIT_EXCEEDED_PATH,
            get(handlers::limit_exceeded_page).post(handlers::wipe_database),
        )
        .route("/logout", get(handlers::logout));

    if let Some(auth) = state.identity.private() {
        app_routes = app_routes.route(
            auth.login_path(),
            get(handlers::login_form).post(handlers::login_submit),
        );
    }

    // Layers run outermost first: identity, then recovery, then the handler.
    let app_routes = app_routes
        .layer(middleware::from_fn_with_state(
            state.clone(),
            recovery_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Health check stays unauthenticated for load balancers and probes.
    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .merge(app_routes);

    // SECURITY: network-restrict /metrics when enabled; see crate::metrics.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
