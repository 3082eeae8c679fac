//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// SECURITY: When enabled, ensure this endpoint is network-restricted
    /// at the infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Mark session cookies `Secure` (only sent over HTTPS).
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
            secure_cookies: false,
        }
    }
}

/// Deployment mode.
///
/// `local` and `private` serve one fixed database; `demo` gives every visitor
/// an isolated database file of their own.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DeploymentConfig {
    /// Single database, no authentication.
    Local {
        /// Database file path.
        #[serde(default = "default_database_path")]
        database_path: PathBuf,
    },
    /// Single database behind a shared password.
    Private {
        /// Database file path.
        #[serde(default = "default_database_path")]
        database_path: PathBuf,
        /// Shared login password.
        /// WARNING: Prefer INVOICER_DEPLOYMENT__PASSWORD over storing it in a file.
        password: String,
        /// HMAC key for the session cookie.
        secret_key: String,
        /// Path of the login form.
        #[serde(default = "default_login_path")]
        login_path: String,
        /// Reject session tokens older than this many seconds (default: never).
        #[serde(default)]
        token_max_age_secs: Option<u64>,
    },
    /// One database per visitor, identified by cookie.
    Demo {
        /// Directory holding `{tenant_id}.db` files. Created on startup.
        database_directory: PathBuf,
        /// Per-tenant size ceiling in bytes.
        #[serde(default = "default_quota_bytes")]
        quota_bytes: u64,
        /// Connections per tenant pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Seconds a request waits for a free tenant connection before failing.
        #[serde(default = "default_acquire_timeout_secs")]
        acquire_timeout_secs: u64,
    },
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/invoicer.db")
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_quota_bytes() -> u64 {
    crate::DEFAULT_TENANT_QUOTA_BYTES
}

fn default_max_connections() -> u32 {
    // SQLite serializes writers; one connection avoids "database is locked" churn.
    1
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self::Local {
            database_path: default_database_path(),
        }
    }
}

impl DeploymentConfig {
    /// Short name of the mode, as written in configuration.
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Private { .. } => "private",
            Self::Demo { .. } => "demo",
        }
    }

    /// Whether each visitor gets an isolated database.
    pub fn is_multitenant(&self) -> bool {
        matches!(self, Self::Demo { .. })
    }

    /// Validate deployment configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Local { .. } => Ok(()),
            Self::Private {
                password,
                secret_key,
                login_path,
                ..
            } => {
                if password.is_empty() {
                    return Err("private deployment requires a non-empty password".to_string());
                }
                if secret_key.is_empty() {
                    return Err("private deployment requires a non-empty secret_key".to_string());
                }
                if !login_path.starts_with('/') || login_path == "/" {
                    return Err(format!(
                        "login_path must be an absolute path other than '/': {login_path}"
                    ));
                }
                Ok(())
            }
            Self::Demo {
                database_directory,
                quota_bytes,
                max_connections,
                acquire_timeout_secs,
            } => {
                if database_directory.as_os_str().is_empty() {
                    return Err("demo deployment requires database_directory".to_string());
                }
                if *quota_bytes == 0 {
                    return Err("quota_bytes must be greater than zero".to_string());
                }
                if *max_connections == 0 {
                    return Err("max_connections must be greater than zero".to_string());
                }
                if *acquire_timeout_secs == 0 {
                    return Err("acquire_timeout_secs must be greater than zero".to_string());
                }
                Ok(())
            }
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Deployment mode and its storage.
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

impl AppConfig {
    /// Create a test configuration in demo mode rooted at `database_directory`.
    ///
    /// **For testing only.**
    pub fn for_testing(database_directory: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig {
                metrics_enabled: false,
                ..ServerConfig::default()
            },
            deployment: DeploymentConfig::Demo {
                database_directory: database_directory.into(),
                quota_bytes: default_quota_bytes(),
                max_connections: default_max_connections(),
                acquire_timeout_secs: default_acquire_timeout_secs(),
            },
        }
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> crate::Result<()> {
        self.deployment
            .validate()
            .map_err(crate::Error::InvalidConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Figment;
    use figment::providers::{Format, Toml};

    fn from_toml(toml: &str) -> AppConfig {
        Figment::new().merge(Toml::string(toml)).extract().unwrap()
    }

    #[test]
    fn test_defaults_to_local_mode() {
        let config = from_toml("");
        assert_eq!(config.deployment.mode_name(), "local");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_demo_mode_defaults() {
        let config = from_toml(
            r#"
            [deployment]
            mode = "demo"
            database_directory = "./data/tenants"
            "#,
        );
        match config.deployment {
            DeploymentConfig::Demo {
                quota_bytes,
                max_connections,
                acquire_timeout_secs,
                ..
            } => {
                assert_eq!(quota_bytes, 10 * 1024 * 1024);
                assert_eq!(max_connections, 1);
                assert_eq!(acquire_timeout_secs, 30);
            }
            other => panic!("unexpected deployment: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result: Result<AppConfig, _> = Figment::new()
            .merge(Toml::string("[deployment]\nmode = \"cloud\""))
            .extract();
        assert!(result.is_err());
    }

    #[test]
    fn test_private_mode_requires_secrets() {
        let config = from_toml(
            r#"
            [deployment]
            mode = "private"
            password = ""
            secret_key = "k"
            "#,
        );
        assert!(config.validate().is_err());

        let config = from_toml(
            r#"
            [deployment]
            mode = "private"
            password = "hunter2"
            secret_key = "k"
            "#,
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_demo_mode_rejects_zero_quota() {
        let deployment = DeploymentConfig::Demo {
            database_directory: PathBuf::from("/tmp/x"),
            quota_bytes: 0,
            max_connections: 1,
            acquire_timeout_secs: 30,
        };
        assert!(deployment.validate().is_err());
    }
}
