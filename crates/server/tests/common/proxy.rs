//! Proxy wrapper that records recreate calls.

use async_trait::async_trait;
use invoicer_core::TenantId;
use invoicer_database::{DatabaseProxy, DbResult, DbSession};
use std::sync::Arc;
use std::sync::Mutex;

/// Forwards to an inner proxy and remembers every `recreate` call.
#[allow(dead_code)]
pub struct CountingProxy {
    inner: Arc<dyn DatabaseProxy>,
    recreated: Mutex<Vec<Option<TenantId>>>,
}

#[allow(dead_code)]
impl CountingProxy {
    pub fn new(inner: Arc<dyn DatabaseProxy>) -> Self {
        Self {
            inner,
            recreated: Mutex::new(Vec::new()),
        }
    }

    pub fn recreate_calls(&self) -> Vec<Option<TenantId>> {
        self.recreated.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatabaseProxy for CountingProxy {
    async fn session(&self, tenant: Option<&TenantId>) -> DbResult<DbSession> {
        self.inner.session(tenant).await
    }

    async fn recreate(&self, tenant: Option<&TenantId>) -> DbResult<()> {
        self.recreated.lock().unwrap().push(tenant.cloned());
        self.inner.recreate(tenant).await
    }

    fn supports_recreate(&self) -> bool {
        self.inner.supports_recreate()
    }

    async fn health_check(&self) -> DbResult<()> {
        self.inner.health_check().await
    }
}
