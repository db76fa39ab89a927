use crate::clock::Clock;
use crate::error::Result;
use crate::state::{EntitlementState, EntitlementSummary, Tier};
use crate::store::EntitlementStore;
use chrono::{DateTime, Utc};
use lootlook_core::ProductId;
use lootlook_db::GrantRecord;
use std::sync::Arc;

/// Free scans per calendar month unless configured otherwise.
pub const DEFAULT_FREE_MONTHLY_SCANS: u32 = 5;

/// Decides whether a scan may run and which credit source pays for it.
///
/// Queries are pure reads of the in-memory state. Mutations apply in memory
/// first, then write the full record through the store. A failed write is
/// logged and the in-memory state stays authoritative; the next successful
/// write carries it. Purchase grants are the exception: they commit in memory
/// only after the store accepts them, and report failures.
pub struct EntitlementEngine {
    state: EntitlementState,
    store: Arc<dyn EntitlementStore>,
    clock: Arc<dyn Clock>,
    free_monthly_scans: u32,
}

impl std::fmt::Debug for EntitlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementEngine")
            .field("state", &self.state)
            .field("free_monthly_scans", &self.free_monthly_scans)
            .finish_non_exhaustive()
    }
}

impl EntitlementEngine {
    /// Load the engine from `store`, creating first-run state if none is saved.
    ///
    /// # Errors
    /// Returns an error if the saved record cannot be read or decoded.
    pub async fn load(
        store: Arc<dyn EntitlementStore>,
        clock: Arc<dyn Clock>,
        free_monthly_scans: u32,
    ) -> Result<Self> {
        let loaded = store.load().await?;
        let first_run = loaded.is_none();
        let mut state = loaded.unwrap_or_else(|| EntitlementState::new(clock.now()));

        let clamped = state.free_scans_used_this_month > free_monthly_scans;
        if clamped {
            tracing::warn!(
                "Stored free scan usage {} exceeds allotment {}, clamping",
                state.free_scans_used_this_month,
                free_monthly_scans
            );
            state.free_scans_used_this_month = free_monthly_scans;
        }

        let engine = Self {
            state,
            store,
            clock,
            free_monthly_scans,
        };

        if first_run {
            tracing::info!("No entitlement state found, starting fresh");
            engine.persist().await;
        } else {
            tracing::debug!("Loaded entitlement state, tier {}", engine.tier());
            if clamped {
                engine.persist().await;
            }
        }

        Ok(engine)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &EntitlementState {
        &self.state
    }

    /// Free scans granted each calendar month.
    #[must_use]
    pub fn free_monthly_scans(&self) -> u32 {
        self.free_monthly_scans
    }

    /// Current time according to the engine's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn store(&self) -> &Arc<dyn EntitlementStore> {
        &self.store
    }

    /// Current tier, derived from the counters.
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.state.tier()
    }

    /// Whether any credit source can pay for a scan. No side effects.
    #[must_use]
    pub fn can_scan(&self) -> bool {
        self.state.can_scan(self.free_monthly_scans)
    }

    /// Free scans left this month, ignoring every other credit source.
    #[must_use]
    pub fn remaining_free_scans(&self) -> u32 {
        self.state.remaining_free_scans(self.free_monthly_scans)
    }

    /// Whether ads should be shown (Free tier only).
    #[must_use]
    pub fn should_show_ads(&self) -> bool {
        self.state.should_show_ads()
    }

    /// Whether Pro is still marked active past its recorded expiry.
    ///
    /// Informational: the engine never deactivates Pro on its own.
    #[must_use]
    pub fn subscription_lapsed(&self) -> bool {
        self.state.subscription_lapsed(self.clock.now())
    }

    /// Snapshot for UI affordances.
    #[must_use]
    pub fn summary(&self) -> EntitlementSummary {
        EntitlementSummary::of(&self.state, self.free_monthly_scans)
    }

    /// Session start hook for the capture flow: runs the monthly reset check.
    pub async fn begin_session(&mut self) -> bool {
        self.check_and_reset_monthly_scans().await
    }

    /// Reset the free allotment if the calendar month changed since the last
    /// reset. Returns `true` if a reset happened; repeat calls in the same
    /// month are no-ops.
    pub async fn check_and_reset_monthly_scans(&mut self) -> bool {
        let now = self.clock.now();
        if !self.state.reset_monthly_if_due(now) {
            return false;
        }
        tracing::info!("Free monthly scans reset at {}", now.to_rfc3339());
        self.persist().await;
        true
    }

    /// Debit one scan. Returns `false`, without changing state, when no
    /// credit source is available; the caller should present the paywall.
    pub async fn consume_scan(&mut self) -> bool {
        match self.state.consume(self.free_monthly_scans) {
            Some(source) => {
                tracing::debug!("Scan paid by {:?}, tier now {}", source, self.tier());
                self.persist().await;
                true
            }
            None => {
                tracing::debug!("Scan denied: no credit source available");
                false
            }
        }
    }

    /// Add purchased pack credits. Zero is ignored.
    pub async fn add_pack_credits(&mut self, credits: u32) {
        if credits == 0 {
            tracing::warn!("Ignoring pack grant of zero credits");
            return;
        }
        self.state.add_pack_credits(credits);
        tracing::info!(
            "Granted {} pack credits, balance {}",
            credits,
            self.state.pack_credits
        );
        self.persist().await;
    }

    /// Add one rewarded-ad bonus scan.
    pub async fn add_rewarded_scan(&mut self) {
        self.state.add_rewarded_scan();
        tracing::info!(
            "Granted rewarded scan, bonus balance {}",
            self.state.rewarded_ad_bonus_scans
        );
        self.persist().await;
    }

    /// Set the Pro subscription status.
    pub async fn set_pro_subscription(
        &mut self,
        active: bool,
        product_id: Option<ProductId>,
        expiry: Option<DateTime<Utc>>,
    ) {
        self.state.set_pro_subscription(active, product_id, expiry);
        tracing::info!(
            "Pro subscription {}, tier now {}",
            if active { "activated" } else { "deactivated" },
            self.tier()
        );
        self.persist().await;
    }

    /// Restore first-run state and wipe the grant ledger.
    ///
    /// Maintenance operation; unlike the scan operations it reports store
    /// failures to the caller.
    ///
    /// # Errors
    /// Returns an error if the store cannot be cleared or written.
    pub async fn reset_all(&mut self) -> Result<()> {
        self.store.clear().await?;
        self.state = EntitlementState::new(self.clock.now());
        self.store.save(&self.state).await?;
        tracing::warn!("Entitlement state reset to defaults");
        Ok(())
    }

    /// Apply `grant` to a copy of the state and write both through the store
    /// in one step. The in-memory state changes only once the write succeeds.
    ///
    /// Returns `false`, changing nothing, if the grant was already recorded.
    pub(crate) async fn commit_grant(
        &mut self,
        grant: &GrantRecord,
        apply: impl FnOnce(&mut EntitlementState) + Send,
    ) -> Result<bool> {
        let mut next = self.state.clone();
        apply(&mut next);
        if !self.store.record_grant_and_save(grant, &next).await? {
            return Ok(false);
        }
        self.state = next;
        Ok(true)
    }

    /// Like [`EntitlementEngine::commit_grant`] without a ledger entry.
    pub(crate) async fn commit(
        &mut self,
        apply: impl FnOnce(&mut EntitlementState) + Send,
    ) -> Result<()> {
        let mut next = self.state.clone();
        apply(&mut next);
        self.store.save(&next).await?;
        self.state = next;
        Ok(())
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.state).await {
            tracing::error!("Failed to persist entitlement state: {}", e);
        }
    }
}
