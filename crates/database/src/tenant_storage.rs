//! Per-tenant database files and the storage quota.

use crate::error::{DbError, DbResult};
use invoicer_core::{TENANT_DATABASE_EXTENSION, TenantId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Suffixes of the files SQLite keeps next to a database.
const SIDECAR_SUFFIXES: &[&str] = &["-journal", "-wal", "-shm"];

/// Maps tenants to database files and decides whether a tenant is within quota.
///
/// The quota is a soft cap: it is checked before a session is handed out and a
/// tenant may overshoot it by whatever one request writes.
#[derive(Clone, Debug)]
pub struct TenantStorage {
    directory: PathBuf,
    quota_bytes: u64,
}

impl TenantStorage {
    pub fn new(directory: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            directory: directory.into(),
            quota_bytes,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    /// Create the database directory if it does not exist.
    pub async fn ensure_directory(&self) -> DbResult<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        Ok(())
    }

    /// `{directory}/{tenant}.db`
    pub fn path_for(&self, tenant: &TenantId) -> PathBuf {
        self.directory
            .join(format!("{tenant}.{TENANT_DATABASE_EXTENSION}"))
    }

    /// Size of the tenant's database file, or `None` if it does not exist.
    pub async fn file_size(&self, tenant: &TenantId) -> DbResult<Option<u64>> {
        match tokio::fs::metadata(self.path_for(tenant)).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// True when the file is missing or strictly smaller than the quota.
    pub async fn within_quota(&self, tenant: &TenantId) -> DbResult<bool> {
        Ok(self
            .file_size(tenant)
            .await?
            .is_none_or(|size| size < self.quota_bytes))
    }

    /// Like [`within_quota`](Self::within_quota) but reports the overage as an error.
    pub async fn check_quota(&self, tenant: &TenantId) -> DbResult<()> {
        match self.file_size(tenant).await? {
            Some(size) if size >= self.quota_bytes => Err(DbError::LimitExceeded {
                tenant: tenant.clone(),
                size,
                limit: self.quota_bytes,
            }),
            _ => Ok(()),
        }
    }

    /// Delete the database file and its journal files. Missing files are ignored.
    pub async fn remove_files(&self, tenant: &TenantId) -> DbResult<()> {
        let path = self.path_for(tenant);
        remove_if_exists(&path).await?;
        for suffix in SIDECAR_SUFFIXES {
            let mut sidecar = path.clone().into_os_string();
            sidecar.push(suffix);
            remove_if_exists(Path::new(&sidecar)).await?;
        }
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> DbResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
