//! SQLite pool setup for the fairday database file.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::domain::models::DatabaseConfig;

/// Path that selects a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Concurrent claims wait this long for the write lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to open database: {0}")]
    PoolCreationFailed(#[source] sqlx::Error),
    #[error("Failed to create database directory {path}: {source}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Open the configured database in WAL mode, creating the file and its
/// directory on first use.
pub async fn open_pool(config: &DatabaseConfig) -> Result<SqlitePool, ConnectionError> {
    if config.path == MEMORY_PATH {
        return open_memory_pool().await;
    }
    let path = Path::new(&config.path);
    ensure_parent_directory(path)?;

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let max_connections = config.max_connections.max(1);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)?;

    tracing::debug!(path = %config.path, max_connections, "database pool ready");
    Ok(pool)
}

/// Fresh in-memory database on a single connection that is never recycled.
/// Closing the pool discards the database.
pub async fn open_memory_pool() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::new().in_memory(true).foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)
}

fn ensure_parent_directory(path: &Path) -> Result<(), ConnectionError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent).map_err(|source| ConnectionError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source,
            })
        }
        _ => Ok(()),
    }
}
