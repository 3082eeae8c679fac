//! Database layer for invoicer.
//!
//! Provides the session proxy used by request handlers, the per-tenant
//! storage manager, and repositories for the application tables.

pub mod engine;
pub mod error;
pub mod models;
pub mod multitenant;
pub mod proxy;
pub mod repos;
pub mod schema;
pub mod session;
pub mod static_db;
pub mod tenant_storage;

pub use engine::Engine;
pub use error::{DbError, DbResult};
pub use multitenant::MultitenantDatabase;
pub use proxy::DatabaseProxy;
pub use session::DbSession;
pub use static_db::StaticDatabase;
pub use tenant_storage::TenantStorage;

use invoicer_core::config::DeploymentConfig;
use std::sync::Arc;
use std::time::Duration;

/// Build the database proxy for a deployment mode.
pub async fn from_config(config: &DeploymentConfig) -> DbResult<Arc<dyn DatabaseProxy>> {
    config.validate().map_err(DbError::Config)?;
    match config {
        DeploymentConfig::Local { database_path }
        | DeploymentConfig::Private { database_path, .. } => {
            let db = StaticDatabase::open(database_path).await?;
            Ok(Arc::new(db))
        }
        DeploymentConfig::Demo {
            database_directory,
            quota_bytes,
            max_connections,
            acquire_timeout_secs,
        } => {
            let storage = TenantStorage::new(database_directory, *quota_bytes);
            let db = MultitenantDatabase::new(storage, *max_connections)
                .await?
                .with_acquire_timeout(Duration::from_secs(*acquire_timeout_secs));
            Ok(Arc::new(db))
        }
    }
}
