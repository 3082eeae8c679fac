//! Login, logout and health endpoints.

use super::html::{escape, page};
use crate::auth::PrivateAuth;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub password: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: &'static str,
    pub version: &'static str,
}

/// The post-login destination, if it is a path on this site.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next)
            if next.starts_with('/')
                && !next.starts_with("//")
                && !next.contains('\\')
                && !next.chars().any(char::is_control) =>
        {
            next
        }
        _ => "/",
    }
}

fn private_auth(state: &AppState) -> ApiResult<&PrivateAuth> {
    state
        .identity
        .private()
        .ok_or_else(|| ApiError::NotFound("login is not enabled".to_string()))
}

fn login_page(auth: &PrivateAuth, next: &str) -> String {
    let action = auth.login_redirect(next);
    format!(
        "<h1>Log in</h1>\n\
         <form action=\"{}\" method=\"post\">\n\
         <label>Password <input type=\"password\" name=\"password\" required autofocus></label>\n\
         <button type=\"submit\">Log in</button>\n</form>",
        escape(&action)
    )
}

/// GET {login_path} - password form, or straight on when already logged in.
pub async fn login_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> ApiResult<Response> {
    let auth = private_auth(&state)?;
    let next = safe_next(query.next.as_deref());
    if auth.is_authenticated(&jar) {
        return Ok(Redirect::to(next).into_response());
    }
    Ok(page("Log in", &login_page(auth, next)).into_response())
}

/// POST {login_path} - check the password and issue a session cookie.
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    let auth = private_auth(&state)?;
    let next = safe_next(query.next.as_deref());
    if !auth.check_password(&form.password) {
        tracing::warn!("Rejected login attempt");
        metrics::LOGIN_FAILURES.inc();
        let body = page("Log in", &login_page(auth, next));
        return Ok((StatusCode::UNAUTHORIZED, body).into_response());
    }
    let cookie = auth.session_cookie()?;
    tracing::info!("Login succeeded");
    Ok((jar.add(cookie), Redirect::to(next)).into_response())
}

/// GET /logout - clear the session cookie.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (state.identity.logout(jar), Redirect::to("/"))
}

/// GET /health - storage reachability.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.database.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        mode: state.config.deployment.mode_name(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}
