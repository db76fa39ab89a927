//! Application state management.

use crate::error::CommandError;
use lootlook_core::AppConfig;
use lootlook_db::Database;
use lootlook_entitlement::{
    Clock, EntitlementEngine, ProductCatalog, PurchaseFlow, SqliteStore, SystemClock,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state shared by every command.
///
/// The engine sits behind a mutex so two mutations never interleave.
pub struct AppState {
    /// Scan entitlement engine
    pub engine: Mutex<EntitlementEngine>,
    /// Purchase and restore handling
    pub purchases: PurchaseFlow,
    database: Database,
}

impl AppState {
    /// Open the database named by `config`, run migrations and load the engine.
    pub async fn open(config: &AppConfig) -> Result<Self, CommandError> {
        let path = config.database_path()?;
        Self::open_at(config, &path, Arc::new(SystemClock)).await
    }

    /// Like [`AppState::open`] with an explicit database path and clock.
    pub async fn open_at(
        config: &AppConfig,
        path: &Path,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CommandError> {
        tracing::info!("Opening entitlement database at {}", path.display());

        let database = Database::new(path).await?;
        database.run_migrations().await?;

        let catalog = ProductCatalog::from_config(&config.catalog)?;
        let store = Arc::new(SqliteStore::new(database.pool().clone()));
        let engine =
            EntitlementEngine::load(store, clock, config.entitlements.free_monthly_scans).await?;

        Ok(Self {
            engine: Mutex::new(engine),
            purchases: PurchaseFlow::new(catalog),
            database,
        })
    }

    /// Close the database. Pending writes have already completed.
    pub async fn close(self) {
        self.database.close().await;
    }
}
