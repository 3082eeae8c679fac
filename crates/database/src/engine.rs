//! SQLite connection pools.

use crate::error::DbResult;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// sqlx's default wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// One database file and the pool of connections open against it.
#[derive(Debug)]
pub struct Engine {
    pool: SqlitePool,
    path: PathBuf,
}

impl Engine {
    /// Open (creating if missing) the database at `path`.
    ///
    /// A session waits at most `acquire_timeout` for a free connection.
    pub async fn open(
        path: impl AsRef<Path>,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> DbResult<Self> {
        let path = path.as_ref();

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            // Rollback journal rather than WAL: committed pages land in the main
            // file, so its size is an honest input to the quota check.
            .journal_mode(SqliteJournalMode::Delete)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(opts)
            .await?;

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close every connection, waiting for checked-out sessions to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
