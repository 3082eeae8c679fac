//! Request-scoped database sessions.

use crate::error::DbResult;
use crate::schema;
use invoicer_core::TenantId;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};

/// A pooled connection handed to one request.
///
/// The connection goes back to its pool when the session is dropped, on every
/// exit path of the handler that owns it.
pub struct DbSession {
    conn: PoolConnection<Sqlite>,
    tenant: Option<TenantId>,
}

impl DbSession {
    pub(crate) fn new(conn: PoolConnection<Sqlite>, tenant: Option<TenantId>) -> Self {
        Self { conn, tenant }
    }

    /// Tenant this session belongs to (`None` in single-database deployments).
    pub fn tenant(&self) -> Option<&TenantId> {
        self.tenant.as_ref()
    }

    /// Raw connection for queries the repositories do not cover.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Row count of every application table, in schema order.
    pub async fn table_row_counts(&mut self) -> DbResult<Vec<(&'static str, i64)>> {
        let mut counts = Vec::with_capacity(schema::TABLES.len());
        for table in schema::TABLES {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&mut *self.conn)
                .await?;
            counts.push((*table, count));
        }
        Ok(counts)
    }
}

impl std::fmt::Debug for DbSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbSession")
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}
