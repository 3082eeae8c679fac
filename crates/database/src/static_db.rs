//! Single fixed database for the `local` and `private` deployments.

use crate::engine::{DEFAULT_ACQUIRE_TIMEOUT, Engine};
use crate::error::{DbError, DbResult};
use crate::proxy::DatabaseProxy;
use crate::schema;
use crate::session::DbSession;
use async_trait::async_trait;
use invoicer_core::TenantId;
use std::path::Path;

/// One database shared by every request.
#[derive(Debug)]
pub struct StaticDatabase {
    engine: Engine,
}

impl StaticDatabase {
    /// Open the database at `path`, creating the file and schema if needed.
    pub async fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let engine = Engine::open(path, 1, DEFAULT_ACQUIRE_TIMEOUT).await?;
        schema::apply(engine.pool()).await?;

        tracing::info!(path = %path.display(), "Opened database");
        Ok(Self { engine })
    }

    pub fn path(&self) -> &Path {
        self.engine.path()
    }
}

#[async_trait]
impl DatabaseProxy for StaticDatabase {
    async fn session(&self, tenant: Option<&TenantId>) -> DbResult<DbSession> {
        if let Some(tenant) = tenant {
            tracing::warn!(
                tenant = %tenant,
                "Tenant id supplied to a single-database deployment, ignoring"
            );
        }
        let conn = self.engine.pool().acquire().await?;
        Ok(DbSession::new(conn, None))
    }

    async fn recreate(&self, _tenant: Option<&TenantId>) -> DbResult<()> {
        Err(DbError::Unsupported(
            "database recreation is only available in multi-tenant deployments".to_string(),
        ))
    }

    fn supports_recreate(&self) -> bool {
        false
    }

    async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(self.engine.pool()).await?;
        Ok(())
    }
}
