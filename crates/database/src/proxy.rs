//! Session acquisition across deployment modes.

use crate::error::DbResult;
use crate::session::DbSession;
use async_trait::async_trait;
use invoicer_core::TenantId;

/// Hands out database sessions and rebuilds broken tenant databases.
///
/// One implementation exists per deployment style and the server picks it once
/// at startup.
#[async_trait]
pub trait DatabaseProxy: Send + Sync {
    /// Acquire a session for `tenant`.
    async fn session(&self, tenant: Option<&TenantId>) -> DbResult<DbSession>;

    /// Drop and recreate the tenant's schema, then compact its file.
    async fn recreate(&self, tenant: Option<&TenantId>) -> DbResult<()>;

    /// Whether [`recreate`](Self::recreate) is available.
    fn supports_recreate(&self) -> bool;

    /// Check that storage is reachable.
    async fn health_check(&self) -> DbResult<()>;
}
