//! Server test utilities.

use super::proxy::CountingProxy;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use invoicer_core::TenantId;
use invoicer_core::config::{AppConfig, DeploymentConfig};
use invoicer_database::{DbSession, MultitenantDatabase, StaticDatabase, TenantStorage};
use invoicer_server::{AppState, IdentityResolver, create_router};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "correct horse";

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub proxy: Arc<CountingProxy>,
    /// Tenant storage, in the demo deployment.
    pub storage: Option<TenantStorage>,
    _temp_dir: TempDir,
}

/// Status, headers and body of a finished request.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub set_cookies: Vec<String>,
    pub body: String,
}

#[allow(dead_code)]
impl TestResponse {
    /// `name=value` of the first Set-Cookie header for `name`.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies
            .iter()
            .filter_map(|header| header.split(';').next())
            .find(|pair| pair.starts_with(&format!("{name}=")))
            .map(str::to_string)
    }

    /// Full Set-Cookie header for `name`.
    pub fn cookie_header(&self, name: &str) -> Option<&str> {
        self.set_cookies
            .iter()
            .map(String::as_str)
            .find(|header| header.starts_with(&format!("{name}=")))
    }
}

#[allow(dead_code)]
impl TestServer {
    /// Multi-tenant deployment with the default quota.
    pub async fn demo() -> Self {
        Self::demo_with_quota(invoicer_core::DEFAULT_TENANT_QUOTA_BYTES).await
    }

    /// Multi-tenant deployment with a custom quota.
    pub async fn demo_with_quota(quota_bytes: u64) -> Self {
        Self::demo_with(quota_bytes, Duration::from_secs(30)).await
    }

    /// Multi-tenant deployment whose sessions give up quickly when the
    /// tenant's only connection is taken.
    pub async fn demo_with_acquire_timeout(acquire_timeout: Duration) -> Self {
        Self::demo_with(invoicer_core::DEFAULT_TENANT_QUOTA_BYTES, acquire_timeout).await
    }

    async fn demo_with(quota_bytes: u64, acquire_timeout: Duration) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let directory = temp_dir.path().join("tenants");

        let mut config = AppConfig::for_testing(&directory);
        config.deployment = DeploymentConfig::Demo {
            database_directory: directory.clone(),
            quota_bytes,
            max_connections: 1,
            acquire_timeout_secs: acquire_timeout.as_secs().max(1),
        };

        let storage = TenantStorage::new(&directory, quota_bytes);
        let database = MultitenantDatabase::new(storage.clone(), 1)
            .await
            .expect("Failed to create tenant databases")
            .with_acquire_timeout(acquire_timeout);
        Self::build(config, Arc::new(database), Some(storage), temp_dir)
    }

    /// Single database without authentication.
    pub async fn local() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let database_path = temp_dir.path().join("local.db");
        let mut config = AppConfig::for_testing(temp_dir.path());
        config.deployment = DeploymentConfig::Local {
            database_path: database_path.clone(),
        };
        let database = StaticDatabase::open(&database_path)
            .await
            .expect("Failed to open database");
        Self::build(config, Arc::new(database), None, temp_dir)
    }

    /// Single database behind [`TEST_PASSWORD`].
    pub async fn private() -> Self {
        Self::private_with(|_| {}).await
    }

    /// Private deployment with custom config modifications.
    pub async fn private_with<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let database_path = temp_dir.path().join("private.db");
        let mut config = AppConfig::for_testing(temp_dir.path());
        config.deployment = DeploymentConfig::Private {
            database_path: database_path.clone(),
            password: TEST_PASSWORD.to_string(),
            secret_key: "test-secret-key".to_string(),
            login_path: "/login".to_string(),
            token_max_age_secs: None,
        };
        modifier(&mut config);

        let database = StaticDatabase::open(&database_path)
            .await
            .expect("Failed to open database");
        Self::build(config, Arc::new(database), None, temp_dir)
    }

    fn build(
        config: AppConfig,
        database: Arc<dyn invoicer_database::DatabaseProxy>,
        storage: Option<TenantStorage>,
        temp_dir: TempDir,
    ) -> Self {
        let identity = IdentityResolver::from_config(&config).expect("Failed to build resolver");
        let proxy = Arc::new(CountingProxy::new(database));
        let state = AppState::new(config, proxy.clone(), identity);
        let router = create_router(state.clone());
        Self {
            router,
            state,
            proxy,
            storage,
            _temp_dir: temp_dir,
        }
    }

    /// Send a request and collect the parts tests look at.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        collect(response).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POST an urlencoded form.
    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }

    /// Visit once without a cookie and return the minted `demo_auth=...` pair.
    pub async fn new_visitor(&self) -> String {
        let response = self.get("/", None).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        response.cookie("demo_auth").expect("tenant cookie")
    }

    /// Tenant id carried by a `demo_auth=...` pair.
    pub fn tenant_of(cookie: &str) -> TenantId {
        let value = cookie.split_once('=').map(|(_, v)| v).unwrap_or(cookie);
        TenantId::parse(value).expect("valid tenant id")
    }

    /// Database file for a tenant.
    pub fn tenant_path(&self, tenant: &TenantId) -> PathBuf {
        self.storage
            .as_ref()
            .expect("demo deployment")
            .path_for(tenant)
    }

    /// A session straight from the proxy, bypassing HTTP.
    pub async fn session(&self, tenant: Option<&TenantId>) -> DbSession {
        self.state
            .database
            .session(tenant)
            .await
            .expect("Failed to open session")
    }
}

async fn collect(response: Response<Body>) -> TestResponse {
    let status = response.status();
    let location = response
        .headers()
        .get(LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let set_cookies = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        location,
        set_cookies,
        body: String::from_utf8_lossy(&body_bytes).into_owned(),
    }
}
