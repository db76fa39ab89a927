//! Integration tests for the entitlement engine
//!
//! Runs the capture, ad-reward and purchase flows end to end against the
//! SQLite store, including restarts.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use lootlook_core::{ProductId, TransactionId};
use lootlook_db::{Database, GrantRecord};
use lootlook_entitlement::{
    EntitlementEngine, EntitlementError, EntitlementState, EntitlementStore, FixedClock,
    MemoryStore, Purchase, PurchaseFlow, SqliteStore, Tier, DEFAULT_FREE_MONTHLY_SCANS,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

/// Create a test database with migrations
async fn create_test_db() -> SqlitePool {
    let db = Database::new(":memory:").await.expect("create test database");
    db.run_migrations().await.expect("run migrations");
    db.pool().clone()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

async fn load(store: Arc<dyn EntitlementStore>, clock: Arc<FixedClock>) -> EntitlementEngine {
    EntitlementEngine::load(store, clock, DEFAULT_FREE_MONTHLY_SCANS)
        .await
        .expect("load engine")
}

/// SQLite store whose state writes fail; ledger-only writes go through.
struct StateWritesFail(SqliteStore);

#[async_trait]
impl EntitlementStore for StateWritesFail {
    async fn load(&self) -> lootlook_entitlement::Result<Option<EntitlementState>> {
        self.0.load().await
    }

    async fn save(&self, _state: &EntitlementState) -> lootlook_entitlement::Result<()> {
        Err(EntitlementError::StoreUnavailable("disk full".to_string()))
    }

    async fn record_grant(&self, grant: &GrantRecord) -> lootlook_entitlement::Result<bool> {
        self.0.record_grant(grant).await
    }

    async fn record_grant_and_save(
        &self,
        _grant: &GrantRecord,
        _state: &EntitlementState,
    ) -> lootlook_entitlement::Result<bool> {
        Err(EntitlementError::StoreUnavailable("disk full".to_string()))
    }

    async fn clear(&self) -> lootlook_entitlement::Result<()> {
        self.0.clear().await
    }
}

#[tokio::test]
async fn test_pack_of_twenty_scenario() {
    let pool = create_test_db().await;
    let clock = Arc::new(FixedClock::new(at(2026, 3, 1)));
    let mut engine = load(Arc::new(SqliteStore::new(pool)), clock).await;

    // Use up the free allotment first
    for _ in 0..DEFAULT_FREE_MONTHLY_SCANS {
        assert!(engine.consume_scan().await);
    }
    assert_eq!(engine.remaining_free_scans(), 0);
    assert!(!engine.can_scan());

    engine.add_pack_credits(20).await;
    assert_eq!(engine.state().pack_credits, 20);
    assert_eq!(engine.tier(), Tier::PackHolder);
    assert!(!engine.should_show_ads());

    for i in 0..20 {
        assert!(engine.consume_scan().await, "scan {i} should succeed");
    }
    assert_eq!(engine.state().pack_credits, 0);
    assert_eq!(engine.tier(), Tier::Free);
    assert!(engine.should_show_ads());

    assert!(!engine.consume_scan().await, "21st scan should be denied");
}

#[tokio::test]
async fn test_priority_ad_bonus_before_pack() {
    let mut state = EntitlementState::new(at(2026, 3, 1));
    state.rewarded_ad_bonus_scans = 1;
    state.pack_credits = 1;
    let store = Arc::new(MemoryStore::with_state(state));
    let mut engine = load(store, Arc::new(FixedClock::new(at(2026, 3, 2)))).await;

    assert!(engine.consume_scan().await);
    assert_eq!(engine.state().rewarded_ad_bonus_scans, 0);
    assert_eq!(engine.state().pack_credits, 1);
    assert_eq!(engine.state().free_scans_used_this_month, 0);
}

#[tokio::test]
async fn test_pack_exhaustion_demotes_to_free() {
    let mut state = EntitlementState::new(at(2026, 3, 1));
    state.pack_credits = 1;
    let store = Arc::new(MemoryStore::with_state(state));
    let mut engine = load(store, Arc::new(FixedClock::new(at(2026, 3, 2)))).await;
    assert_eq!(engine.tier(), Tier::PackHolder);

    assert!(engine.consume_scan().await);
    assert_eq!(engine.state().pack_credits, 0);
    assert_eq!(engine.tier(), Tier::Free);
}

#[tokio::test]
async fn test_monthly_rollover_replenishes_free_scans() {
    let mut state = EntitlementState::new(at(2026, 2, 14));
    state.free_scans_used_this_month = 5;
    let store = Arc::new(MemoryStore::with_state(state));
    let clock = Arc::new(FixedClock::new(at(2026, 2, 28)));
    let mut engine = load(store, clock.clone()).await;

    engine.check_and_reset_monthly_scans().await;
    assert!(!engine.can_scan(), "same month: still exhausted");

    clock.set(at(2026, 3, 1));
    assert!(engine.check_and_reset_monthly_scans().await);
    assert!(engine.can_scan());
    assert_eq!(engine.remaining_free_scans(), 5);

    let reset_at = engine.state().free_scans_reset_at;
    assert!(!engine.check_and_reset_monthly_scans().await);
    assert_eq!(engine.state().free_scans_reset_at, reset_at);
}

#[tokio::test]
async fn test_exhausted_engine_never_goes_negative() {
    let store = Arc::new(MemoryStore::new());
    let mut engine = load(store, Arc::new(FixedClock::new(at(2026, 3, 1)))).await;
    engine.add_rewarded_scan().await;
    engine.add_pack_credits(2).await;

    let mut granted = 0;
    for _ in 0..20 {
        if engine.consume_scan().await {
            granted += 1;
        }
    }
    assert_eq!(granted, 1 + 2 + DEFAULT_FREE_MONTHLY_SCANS);

    let exhausted = engine.state().clone();
    assert_eq!(exhausted.rewarded_ad_bonus_scans, 0);
    assert_eq!(exhausted.pack_credits, 0);
    assert_eq!(exhausted.free_scans_used_this_month, DEFAULT_FREE_MONTHLY_SCANS);

    assert!(!engine.consume_scan().await);
    assert_eq!(engine.state(), &exhausted);
}

#[tokio::test]
async fn test_pro_subscriber_is_uncapped() {
    let store = Arc::new(MemoryStore::new());
    let mut engine = load(store, Arc::new(FixedClock::new(at(2026, 3, 1)))).await;
    engine.add_pack_credits(20).await;
    engine
        .set_pro_subscription(
            true,
            Some(ProductId::new("lootlook.pro.monthly").unwrap()),
            Some(at(2026, 4, 1)),
        )
        .await;

    for _ in 0..200 {
        assert!(engine.consume_scan().await);
    }
    assert_eq!(engine.state().pack_credits, 20);
    assert_eq!(engine.remaining_free_scans(), 5);

    // Dropping Pro falls back to the pack balance
    engine.set_pro_subscription(false, None, None).await;
    assert_eq!(engine.tier(), Tier::PackHolder);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("lootlook.db");
    let clock = Arc::new(FixedClock::new(at(2026, 3, 10)));

    let before = {
        let db = Database::new(&path).await.expect("open database");
        db.run_migrations().await.expect("run migrations");
        let mut engine = load(Arc::new(SqliteStore::new(db.pool().clone())), clock.clone()).await;

        engine.add_pack_credits(100).await;
        engine.add_rewarded_scan().await;
        engine.add_rewarded_scan().await;
        assert!(engine.consume_scan().await);
        assert!(engine.consume_scan().await);
        assert!(engine.consume_scan().await);
        engine
            .set_pro_subscription(
                true,
                Some(ProductId::new("lootlook.pro.yearly").unwrap()),
                Some(at(2027, 3, 10)),
            )
            .await;

        let state = engine.state().clone();
        db.close().await;
        state
    };

    let db = Database::new(&path).await.expect("reopen database");
    db.run_migrations().await.expect("run migrations");
    let engine = load(Arc::new(SqliteStore::new(db.pool().clone())), clock).await;

    assert_eq!(engine.state(), &before);
    assert_eq!(engine.state().pack_credits, 99);
    assert_eq!(engine.state().rewarded_ad_bonus_scans, 0);
    assert_eq!(engine.tier(), Tier::ProSubscriber);
}

#[tokio::test]
async fn test_purchase_flow_against_sqlite_ledger() {
    let pool = create_test_db().await;
    let clock = Arc::new(FixedClock::new(at(2026, 3, 10)));
    let mut engine = load(Arc::new(SqliteStore::new(pool.clone())), clock).await;
    let flow = PurchaseFlow::default();

    let pack = Purchase {
        transaction_id: TransactionId::new("GPA.1234-5678").unwrap(),
        product_id: ProductId::new("lootlook.pack.20").unwrap(),
        purchased_at: at(2026, 3, 10),
    };
    flow.apply_purchase(&mut engine, &pack).await.unwrap();
    flow.restore(&mut engine, &[pack.clone()]).await.unwrap();
    assert_eq!(engine.state().pack_credits, 20);

    let ledger = lootlook_db::grants::list_grants(&pool).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].transaction_id, pack.transaction_id);
}

#[tokio::test]
async fn test_unsaved_purchase_is_restorable_after_restart() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("lootlook.db");
    let clock = Arc::new(FixedClock::new(at(2026, 3, 1)));
    let paid = Purchase {
        transaction_id: TransactionId::new("GPA.0001").unwrap(),
        product_id: ProductId::new("lootlook.pack.100").unwrap(),
        purchased_at: at(2026, 3, 1),
    };

    {
        let db = Database::new(&path).await.expect("open database");
        db.run_migrations().await.expect("run migrations");
        let store = SqliteStore::new(db.pool().clone());
        store
            .save(&EntitlementState::new(at(2026, 3, 1)))
            .await
            .expect("seed state");

        let failing = Arc::new(StateWritesFail(store));
        let mut engine = load(failing, clock.clone()).await;
        let result = PurchaseFlow::default()
            .apply_purchase(&mut engine, &paid)
            .await;
        assert!(result.is_err());
        assert_eq!(engine.state().pack_credits, 0);
        db.close().await;
    }

    let db = Database::new(&path).await.expect("reopen database");
    db.run_migrations().await.expect("run migrations");
    assert!(!lootlook_db::grants::has_grant(db.pool(), &paid.transaction_id)
        .await
        .unwrap());

    let mut engine = load(Arc::new(SqliteStore::new(db.pool().clone())), clock).await;
    assert_eq!(engine.state().pack_credits, 0);

    let report = PurchaseFlow::default()
        .restore(&mut engine, &[paid])
        .await
        .expect("restore purchases");
    assert_eq!(report.credits_restored, 100);
    assert_eq!(engine.state().pack_credits, 100);
    db.close().await;
}
