//! SQLite connection pool setup.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Open a `SQLite` connection pool at `path`.
///
/// `:memory:` opens an in-memory database shared by every connection in the
/// pool. File databases are created (with their parent directory) on first
/// open and use WAL journaling.
///
/// # Errors
/// Returns `DatabaseError` if the path is not valid UTF-8, the parent
/// directory cannot be created, or the pool cannot connect.
pub async fn open_pool(path: impl AsRef<Path>) -> Result<Pool<Sqlite>> {
    let path = path.as_ref();
    let path_str = path
        .to_str()
        .ok_or_else(|| DatabaseError::Open("invalid database path: not valid UTF-8".to_string()))?;

    let connect_options = if path_str == IN_MEMORY {
        SqliteConnectOptions::from_str(IN_MEMORY)
            .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
    } else {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options.foreign_keys(true))
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to initialize pool: {e}")))?;

    tracing::info!("Database pool created at {}", path_str);

    Ok(pool)
}
