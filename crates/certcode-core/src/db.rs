//! `SQLite` connection helpers and the storage error type.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        Self::Query(e.to_string())
    }
}

impl DatabaseError {
    /// Whether this error means "no matching row".
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Where a pool connects to.
#[derive(Debug, Clone, Copy)]
pub enum Location<'a> {
    /// A database file, created with its parent directory if missing.
    File(&'a Path),
    /// A private in-memory database.
    Memory,
}

/// Connect a pool.
///
/// Files use WAL and a 5 s busy timeout so concurrent writers wait for
/// each other. An in-memory pool holds a single connection, since every
/// `:memory:` connection is a separate database.
pub async fn connect(location: Location<'_>) -> Result<SqlitePool, DatabaseError> {
    let (options, max_connections) = match location {
        Location::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io(e.to_string()))?;
            }
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5));
            (options, 5)
        }
        Location::Memory => (SqliteConnectOptions::new().in_memory(true), 1),
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

    if let Location::File(path) = location {
        info!(path = %path.display(), "Database opened");
    }
    Ok(pool)
}

/// Seconds since the Unix epoch.
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unix_timestamp_is_reasonable() {
        // After 2024-01-01.
        assert!(unix_timestamp() > 1_704_067_200);
    }

    #[test]
    fn not_found_is_recognised() {
        assert!(DatabaseError::NotFound("x".into()).is_not_found());
        assert!(!DatabaseError::Query("x".into()).is_not_found());
    }

    #[tokio::test]
    async fn file_pool_creates_parent_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("certs.db");

        let pool = connect(Location::File(&path)).await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();

        assert_eq!(row.0, 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn memory_pool_keeps_its_tables() {
        let pool = connect(Location::Memory).await.unwrap();
        sqlx::query("CREATE TABLE t (v TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t VALUES ('ok')")
            .execute(&pool)
            .await
            .unwrap();

        let row: (String,) = sqlx::query_as("SELECT v FROM t").fetch_one(&pool).await.unwrap();
        assert_eq!(row.0, "ok");
    }
}
