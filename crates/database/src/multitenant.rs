//! One lazily created database per tenant.
//!
//! Engines are cached for the life of the process. The first request for a
//! tenant opens the file and applies the schema; later requests reuse the
//! cached pool. A per-tenant `OnceCell` makes concurrent first requests wait
//! for a single initialization instead of racing to create the schema.

use crate::engine::{DEFAULT_ACQUIRE_TIMEOUT, Engine};
use crate::error::{DbError, DbResult};
use crate::proxy::DatabaseProxy;
use crate::schema;
use crate::session::DbSession;
use crate::tenant_storage::TenantStorage;
use async_trait::async_trait;
use invoicer_core::TenantId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};

type EngineCell = Arc<OnceCell<Arc<Engine>>>;

/// Per-tenant databases with quota enforcement and recovery.
pub struct MultitenantDatabase {
    storage: TenantStorage,
    max_connections: u32,
    acquire_timeout: Duration,
    engines: Mutex<HashMap<TenantId, EngineCell>>,
    schema_applications: AtomicU64,
    recreations: AtomicU64,
}

impl MultitenantDatabase {
    /// Create the proxy, making sure the database directory exists.
    pub async fn new(storage: TenantStorage, max_connections: u32) -> DbResult<Self> {
        if max_connections == 0 {
            return Err(DbError::Config(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        storage.ensure_directory().await?;
        tracing::info!(
            directory = %storage.directory().display(),
            quota_bytes = storage.quota_bytes(),
            "Multi-tenant databases enabled"
        );
        Ok(Self {
            storage,
            max_connections,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            engines: Mutex::new(HashMap::new()),
            schema_applications: AtomicU64::new(0),
            recreations: AtomicU64::new(0),
        })
    }

    /// How long a session waits for a free tenant connection.
    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    pub fn storage(&self) -> &TenantStorage {
        &self.storage
    }

    /// Number of times the schema was applied to a freshly opened engine.
    pub fn schema_applications(&self) -> u64 {
        self.schema_applications.load(Ordering::Relaxed)
    }

    /// Number of successful recreations since startup.
    pub fn recreations(&self) -> u64 {
        self.recreations.load(Ordering::Relaxed)
    }

    /// The cached engine for `tenant`, if one has been initialized.
    pub async fn cached_engine(&self, tenant: &TenantId) -> Option<Arc<Engine>> {
        let engines = self.engines.lock().await;
        engines.get(tenant).and_then(|cell| cell.get().cloned())
    }

    async fn engine_for(&self, tenant: &TenantId) -> DbResult<Arc<Engine>> {
        // Hold the map lock only long enough to find or insert the cell.
        let cell = {
            let mut engines = self.engines.lock().await;
            engines.entry(tenant.clone()).or_default().clone()
        };
        let engine = cell.get_or_try_init(|| self.open_engine(tenant)).await?;
        Ok(engine.clone())
    }

    async fn open_engine(&self, tenant: &TenantId) -> DbResult<Arc<Engine>> {
        let path = self.storage.path_for(tenant);
        let engine = Engine::open(&path, self.max_connections, self.acquire_timeout).await?;

        schema::apply(engine.pool()).await?;

        self.schema_applications.fetch_add(1, Ordering::Relaxed);
        tracing::info!(tenant = %tenant, path = %path.display(), "Opened tenant database");
        Ok(Arc::new(engine))
    }

    /// Forget the cached engine and close its pool.
    async fn evict(&self, tenant: &TenantId) {
        let cell = self.engines.lock().await.remove(tenant);
        if let Some(engine) = cell.and_then(|cell| cell.get().cloned()) {
            engine.close().await;
        }
    }

    async fn reset_in_place(&self, engine: &Engine) -> DbResult<()> {
        let pool = engine.pool();
        schema::drop_all(pool).await?;
        schema::apply(pool).await?;
        schema::compact(pool).await?;
        Ok(())
    }

    /// Throw the file away and start from an empty one.
    async fn rebuild(&self, tenant: &TenantId) -> DbResult<()> {
        self.evict(tenant).await;
        self.storage.remove_files(tenant).await?;
        self.engine_for(tenant).await?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseProxy for MultitenantDatabase {
    async fn session(&self, tenant: Option<&TenantId>) -> DbResult<DbSession> {
        let tenant = tenant.ok_or(DbError::MissingTenant)?;

        self.storage.check_quota(tenant).await?;

        // A cached pool would keep writing to an unlinked inode, so a file
        // deleted underneath us means starting over.
        if let Some(engine) = self.cached_engine(tenant).await
            && !tokio::fs::try_exists(engine.path()).await.unwrap_or(false)
        {
            tracing::warn!(tenant = %tenant, "Tenant database file vanished, reopening");
            self.evict(tenant).await;
        }

        let engine = self.engine_for(tenant).await?;
        let conn = engine.pool().acquire().await?;
        Ok(DbSession::new(conn, Some(tenant.clone())))
    }

    async fn recreate(&self, tenant: Option<&TenantId>) -> DbResult<()> {
        let tenant = tenant.ok_or(DbError::MissingTenant)?;
        let size_before = self.storage.file_size(tenant).await.ok().flatten();
        tracing::warn!(tenant = %tenant, size_before = ?size_before, "Recreating tenant database");

        let in_place = match self.engine_for(tenant).await {
            Ok(engine) => self.reset_in_place(&engine).await,
            Err(e) => Err(e),
        };
        if let Err(e) = in_place {
            tracing::warn!(
                tenant = %tenant,
                error = %e,
                "In-place reset failed, rebuilding database file"
            );
            self.rebuild(tenant).await?;
        }

        self.recreations.fetch_add(1, Ordering::Relaxed);
        let size_after = self.storage.file_size(tenant).await.ok().flatten();
        tracing::info!(tenant = %tenant, size_after = ?size_after, "Tenant database recreated");
        Ok(())
    }

    fn supports_recreate(&self) -> bool {
        true
    }

    async fn health_check(&self) -> DbResult<()> {
        let meta = tokio::fs::metadata(self.storage.directory()).await?;
        if !meta.is_dir() {
            return Err(DbError::Config(format!(
                "{} is not a directory",
                self.storage.directory().display()
            )));
        }
        Ok(())
    }
}
