//! Application state shared across handlers.

use crate::auth::IdentityResolver;
use invoicer_core::config::AppConfig;
use invoicer_database::DatabaseProxy;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Session proxy for the deployment's database(s).
    pub database: Arc<dyn DatabaseProxy>,
    /// Identity resolver for the deployment mode.
    pub identity: Arc<IdentityResolver>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        database: Arc<dyn DatabaseProxy>,
        identity: IdentityResolver,
    ) -> Self {
        Self {
            config: Arc::new(config),
            database,
            identity: Arc::new(identity),
        }
    }
}
