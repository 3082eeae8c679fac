//! Database error types.

use invoicer_core::TenantId;
use thiserror::Error;

/// Database layer errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("a tenant id is required in multi-tenant deployments")]
    MissingTenant,

    #[error("database limit exceeded for tenant {tenant}: {size} bytes (limit {limit})")]
    LimitExceeded {
        tenant: TenantId,
        size: u64,
        limit: u64,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid stored value: {0}")]
    InvalidValue(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether the underlying storage is broken, missing or corrupt.
    ///
    /// These are the failures that recreating the tenant database can fix.
    /// Constraint violations and lookups of missing rows are not operational.
    pub fn is_operational(&self) -> bool {
        match self {
            Self::Database(e) => is_operational_sqlx(e),
            Self::Io(_) => true,
            _ => false,
        }
    }

    /// Whether the database was merely busy: no free pooled connection, or
    /// SQLite reporting `SQLITE_BUSY`/`SQLITE_LOCKED` after its busy timeout.
    ///
    /// Contention says nothing about the file's health and never warrants a
    /// recreate.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Database(e) => is_busy_sqlx(e),
            _ => false,
        }
    }

    /// Whether this is a uniqueness, foreign key, not-null or check violation.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => !matches!(
                db.kind(),
                sqlx::error::ErrorKind::Other
            ),
            _ => false,
        }
    }
}

// Primary result codes; extended codes carry them in the low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_busy_sqlx(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
        _ => false,
    }
}

fn is_operational_sqlx(e: &sqlx::Error) -> bool {
    if is_busy_sqlx(e) {
        return false;
    }
    match e {
        sqlx::Error::Database(db) => matches!(db.kind(), sqlx::error::ErrorKind::Other),
        sqlx::Error::Io(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::ColumnNotFound(_) => true,
        _ => false,
    }
}

/// Result type for database operations.
pub type DbResult<T> = std::result::Result<T, DbError>;
