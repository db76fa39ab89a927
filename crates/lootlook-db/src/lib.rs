//! LootLook Database Layer
//!
//! Provides `SQLite` access through `SQLx` with embedded migrations.
//!
//! # Architecture
//!
//! - **Settings**: named JSON records in a key/value table (the entitlement
//!   state lives here under a single key)
//! - **Grant ledger**: applied purchase transactions, keyed by transaction ID
//! - **Migrations**: SQL migrations are embedded and versioned using `SQLx`
//!
//! # Example
//!
//! ```ignore
//! use lootlook_db::Database;
//!
//! let db = Database::new("lootlook.db").await?;
//! db.run_migrations().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod grants;
pub mod migrations;
pub mod settings;

// Re-export commonly used types
pub use error::{DatabaseError, Result};
pub use grants::{GrantKind, GrantRecord};

use std::path::Path;

/// High-level database handle: a connection pool plus schema management.
#[derive(Debug, Clone)]
pub struct Database {
    pool: sqlx::SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `path`.
    ///
    /// Pass `:memory:` for an in-memory database.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path).await?;
        Ok(Self { pool })
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
