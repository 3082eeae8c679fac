//! Request identity: who is calling and which tenant database they own.
//!
//! The deployment mode picks one [`IdentityResolver`] at startup. The
//! middleware asks it for an [`AuthOutcome`] on every request and either
//! returns the redirect it produced or lets the request through with a
//! [`RequestTenant`] extension.

use crate::metrics;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use invoicer_core::TenantId;
use invoicer_core::config::{AppConfig, DeploymentConfig};
use invoicer_signer::{SignerResult, TokenSigner};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::RngCore;
use tracing::Instrument;
use uuid::Uuid;

/// Cookie carrying the visitor's tenant id in the demo deployment.
pub const TENANT_COOKIE: &str = "demo_auth";

/// Cookie carrying the signed session token in the private deployment.
pub const PRIVATE_COOKIE: &str = "private_auth";

/// Random bytes in a minted tenant id.
const TENANT_ID_BYTES: usize = 24;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

// Characters left readable in the `next` query parameter.
const NEXT_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value, truncated and limited
    /// to printable ASCII.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant resolved for the current request (`None` outside the demo deployment).
#[derive(Clone, Debug, Default)]
pub struct RequestTenant(pub Option<TenantId>);

/// Result of checking a request's identity.
#[derive(Debug)]
pub enum AuthOutcome {
    /// Proceed, with the tenant the request belongs to.
    Authenticated(Option<TenantId>),
    /// Stop and send this response instead.
    Redirect(Response),
}

/// Password-gated single database.
pub struct PrivateAuth {
    password: String,
    signer: TokenSigner,
    login_path: String,
    token_max_age: Option<time::Duration>,
    secure_cookies: bool,
}

impl PrivateAuth {
    pub fn new(
        password: impl Into<String>,
        secret_key: &str,
        login_path: impl Into<String>,
        token_max_age: Option<time::Duration>,
        secure_cookies: bool,
    ) -> SignerResult<Self> {
        Ok(Self {
            password: password.into(),
            signer: TokenSigner::new(secret_key)?,
            login_path: login_path.into(),
            token_max_age,
            secure_cookies,
        })
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Whether the request carries a session cookie that verifies.
    pub fn is_authenticated(&self, jar: &CookieJar) -> bool {
        let Some(cookie) = jar.get(PRIVATE_COOKIE) else {
            return false;
        };
        match self.token_max_age {
            Some(max_age) => self.signer.verify_with_max_age(cookie.value(), max_age),
            None => self.signer.verify(cookie.value()),
        }
    }

    /// Plain comparison against the configured password.
    pub fn check_password(&self, candidate: &str) -> bool {
        candidate == self.password
    }

    /// A freshly signed session cookie.
    pub fn session_cookie(&self) -> SignerResult<Cookie<'static>> {
        let token = self.signer.generate()?;
        Ok(session_cookie(PRIVATE_COOKIE, token, self.secure_cookies))
    }

    /// Where an unauthenticated request for `path` is sent.
    pub fn login_redirect(&self, path: &str) -> String {
        format!(
            "{}?next={}",
            self.login_path,
            utf8_percent_encode(path, NEXT_PARAM)
        )
    }
}

impl std::fmt::Debug for PrivateAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateAuth")
            .field("login_path", &self.login_path)
            .field("token_max_age", &self.token_max_age)
            .finish_non_exhaustive()
    }
}

/// Decides who a request belongs to, one variant per deployment mode.
#[derive(Debug)]
pub enum IdentityResolver {
    /// No authentication, one shared database.
    Open,
    /// Shared password, one shared database.
    Private(PrivateAuth),
    /// Anonymous visitors, each with a database of their own.
    Multitenant { secure_cookies: bool },
}

impl IdentityResolver {
    /// Build the resolver for the configured deployment.
    pub fn from_config(config: &AppConfig) -> SignerResult<Self> {
        let secure_cookies = config.server.secure_cookies;
        let resolver = match &config.deployment {
            DeploymentConfig::Local { .. } => Self::Open,
            DeploymentConfig::Private {
                password,
                secret_key,
                login_path,
                token_max_age_secs,
                ..
            } => {
                let max_age = token_max_age_secs
                    .and_then(|secs| i64::try_from(secs).ok())
                    .map(time::Duration::seconds);
                Self::Private(PrivateAuth::new(
                    password.as_str(),
                    secret_key,
                    login_path.as_str(),
                    max_age,
                    secure_cookies,
                )?)
            }
            DeploymentConfig::Demo { .. } => Self::Multitenant { secure_cookies },
        };
        Ok(resolver)
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Private(_) => "private",
            Self::Multitenant { .. } => "multitenant",
        }
    }

    /// Name of the cookie this mode relies on, if any.
    pub fn cookie_name(&self) -> Option<&'static str> {
        match self {
            Self::Open => None,
            Self::Private(_) => Some(PRIVATE_COOKIE),
            Self::Multitenant { .. } => Some(TENANT_COOKIE),
        }
    }

    pub fn private(&self) -> Option<&PrivateAuth> {
        match self {
            Self::Private(auth) => Some(auth),
            _ => None,
        }
    }

    /// Tenant id carried by the request. Only the demo deployment has one.
    pub fn tenant_id(&self, jar: &CookieJar) -> Option<TenantId> {
        match self {
            Self::Multitenant { .. } => {
                let cookie = jar.get(TENANT_COOKIE)?;
                match TenantId::parse(cookie.value()) {
                    Ok(tenant) => Some(tenant),
                    Err(e) => {
                        tracing::debug!(error = %e, "Ignoring malformed tenant cookie");
                        None
                    }
                }
            }
            _ => None,
        }
    }

    /// Decide whether the request may proceed.
    pub fn check(&self, jar: &CookieJar, uri: &Uri) -> AuthOutcome {
        match self {
            Self::Open => AuthOutcome::Authenticated(None),
            Self::Private(auth) => {
                if auth.is_authenticated(jar) || uri.path() == auth.login_path() {
                    AuthOutcome::Authenticated(None)
                } else {
                    let target = auth.login_redirect(uri.path());
                    AuthOutcome::Redirect(Redirect::to(&target).into_response())
                }
            }
            Self::Multitenant { secure_cookies } => match self.tenant_id(jar) {
                Some(tenant) => AuthOutcome::Authenticated(Some(tenant)),
                None => {
                    let cookie = session_cookie(TENANT_COOKIE, mint_tenant_id(), *secure_cookies);
                    let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
                    let jar = CookieJar::new().add(cookie);
                    AuthOutcome::Redirect((jar, Redirect::to(target)).into_response())
                }
            },
        }
    }

    /// Drop this mode's cookie from the client.
    pub fn logout(&self, jar: CookieJar) -> CookieJar {
        match self.cookie_name() {
            Some(name) => jar.remove(Cookie::build(name).path("/")),
            None => jar,
        }
    }
}

/// 48 lowercase hex characters from the thread-local CSPRNG.
pub fn mint_tenant_id() -> String {
    let mut bytes = [0u8; TENANT_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Identity middleware: redirects unauthenticated requests and tags the rest
/// with their tenant.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let trace_id = extract_or_generate_trace_id(&req);
    let span = tracing::info_span!("request", trace_id = %trace_id, tenant = tracing::field::Empty);

    let jar = CookieJar::from_headers(req.headers());
    match state.identity.check(&jar, req.uri()) {
        AuthOutcome::Redirect(response) => {
            span.in_scope(|| {
                tracing::debug!(
                    mode = state.identity.mode_name(),
                    path = %req.uri().path(),
                    "Redirecting unauthenticated request"
                )
            });
            metrics::AUTH_REDIRECTS
                .with_label_values(&[state.identity.mode_name()])
                .inc();
            response
        }
        AuthOutcome::Authenticated(tenant) => {
            if let Some(tenant) = &tenant {
                span.record("tenant", tenant.as_str());
            }
            req.extensions_mut().insert(RequestTenant(tenant));
            next.run(req).instrument(span).await
        }
    }
}
