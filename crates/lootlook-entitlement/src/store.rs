//! Persistence adapters for entitlement state.
//!
//! The engine loads once at construction and writes the full record after
//! every mutation. Writes are last-write-wins.

use crate::error::{EntitlementError, Result};
use crate::state::EntitlementState;
use async_trait::async_trait;
use lootlook_db::GrantRecord;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Settings key holding the entitlement record.
pub const ENTITLEMENT_STATE_KEY: &str = "entitlement_state";

/// Durable storage for the entitlement record and the grant ledger.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Load the saved state, `None` on first run.
    async fn load(&self) -> Result<Option<EntitlementState>>;

    /// Replace the saved state.
    async fn save(&self, state: &EntitlementState) -> Result<()>;

    /// Record an applied purchase. Returns `false` if the transaction was
    /// already recorded.
    async fn record_grant(&self, grant: &GrantRecord) -> Result<bool>;

    /// Record an applied purchase and save the state it produced as one
    /// write. Returns `false`, saving nothing, if the transaction was
    /// already recorded.
    async fn record_grant_and_save(
        &self,
        grant: &GrantRecord,
        state: &EntitlementState,
    ) -> Result<bool>;

    /// Delete the saved state and the grant ledger.
    async fn clear(&self) -> Result<()>;
}

/// `SQLite`-backed store using the settings table and grant ledger.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store over a migrated pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementStore for SqliteStore {
    async fn load(&self) -> Result<Option<EntitlementState>> {
        let value = lootlook_db::settings::get_setting(&self.pool, ENTITLEMENT_STATE_KEY).await?;

        match value {
            Some(v) => {
                let state: EntitlementState = serde_json::from_value(v)?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, state: &EntitlementState) -> Result<()> {
        let value = serde_json::to_value(state)?;
        lootlook_db::settings::set_setting(&self.pool, ENTITLEMENT_STATE_KEY, &value).await?;
        Ok(())
    }

    async fn record_grant(&self, grant: &GrantRecord) -> Result<bool> {
        Ok(lootlook_db::grants::record_grant(&self.pool, grant).await?)
    }

    async fn record_grant_and_save(
        &self,
        grant: &GrantRecord,
        state: &EntitlementState,
    ) -> Result<bool> {
        let value = serde_json::to_value(state)?;
        Ok(lootlook_db::grants::record_grant_with_setting(
            &self.pool,
            grant,
            ENTITLEMENT_STATE_KEY,
            &value,
        )
        .await?)
    }

    async fn clear(&self) -> Result<()> {
        lootlook_db::settings::delete_setting(&self.pool, ENTITLEMENT_STATE_KEY).await?;
        let removed = lootlook_db::grants::clear_grants(&self.pool).await?;
        tracing::debug!("Cleared entitlement state and {} ledger entries", removed);
        Ok(())
    }
}

/// In-memory store for tests and previews.
///
/// Writes can be made to fail with [`MemoryStore::set_fail_writes`], or
/// state saves alone with [`MemoryStore::set_fail_saves`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<EntitlementState>>,
    grants: Mutex<HashMap<String, GrantRecord>>,
    fail_writes: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `state`.
    #[must_use]
    pub fn with_state(state: EntitlementState) -> Self {
        let store = Self::default();
        *store.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(state);
        store
    }

    /// Make subsequent `save` and `record_grant` calls fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent state saves fail while ledger-only writes succeed.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The last successfully saved state.
    #[must_use]
    pub fn saved(&self) -> Option<EntitlementState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of recorded grants.
    #[must_use]
    pub fn grant_count(&self) -> usize {
        self.grants
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EntitlementError::StoreUnavailable(
                "memory store is read-only".to_string(),
            ));
        }
        Ok(())
    }

    fn check_saveable(&self) -> Result<()> {
        self.check_writable()?;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(EntitlementError::StoreUnavailable(
                "memory store rejects state saves".to_string(),
            ));
        }
        Ok(())
    }

    fn store_state(&self, state: &EntitlementState) {
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn load(&self) -> Result<Option<EntitlementState>> {
        Ok(self.saved())
    }

    async fn save(&self, state: &EntitlementState) -> Result<()> {
        self.check_saveable()?;
        self.store_state(state);
        Ok(())
    }

    async fn record_grant(&self, grant: &GrantRecord) -> Result<bool> {
        self.check_writable()?;
        let mut grants = self
            .grants
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let key = grant.transaction_id.as_str().to_string();
        if grants.contains_key(&key) {
            return Ok(false);
        }
        grants.insert(key, grant.clone());
        Ok(true)
    }

    async fn record_grant_and_save(
        &self,
        grant: &GrantRecord,
        state: &EntitlementState,
    ) -> Result<bool> {
        self.check_saveable()?;
        let mut grants = self
            .grants
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let key = grant.transaction_id.as_str().to_string();
        if grants.contains_key(&key) {
            return Ok(false);
        }
        grants.insert(key, grant.clone());
        self.store_state(state);
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        self.check_writable()?;
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        self.grants
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
