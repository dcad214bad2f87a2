//! Database connection and initialization.

use std::path::Path;

use sqlx::SqlitePool;
use tracing::info;

use certcode_core::db::{Location, connect};
pub use certcode_core::db::DatabaseError;

/// Handle to the certificate store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct CertificateDatabase {
    pool: SqlitePool,
}

impl CertificateDatabase {
    /// Open or create the database file and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        Self::migrated(connect(Location::File(path)).await?).await
    }

    /// Fresh in-memory database (for tests).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::migrated(connect(Location::Memory).await?).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        info!("Certificate database migrations complete");
        Ok(Self { pool })
    }

    pub(super) const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_works() {
        let db = CertificateDatabase::open_in_memory().await;
        assert!(db.is_ok());
    }

    #[tokio::test]
    async fn reopening_a_file_keeps_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("certificates.db");

        let db = CertificateDatabase::open(&path).await.unwrap();
        sqlx::query("INSERT INTO certificates (code, type, created_at, updated_at) VALUES ('C1', 'Gold', 0, 0)")
            .execute(db.pool())
            .await
            .unwrap();
        db.pool().close().await;

        let reopened = CertificateDatabase::open(&path).await.unwrap();
        assert_eq!(reopened.count_total().await.unwrap(), 1);
    }
}
