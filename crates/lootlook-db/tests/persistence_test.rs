//! Integration tests for on-disk persistence across reopen.

use chrono::Utc;
use lootlook_core::{ProductId, TransactionId};
use lootlook_db::{grants, settings, Database, GrantKind, GrantRecord};
use tempfile::TempDir;

#[tokio::test]
async fn test_settings_survive_reopen() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("lootlook.db");

    let db = Database::new(&path).await.expect("open database");
    db.run_migrations().await.expect("run migrations");
    settings::set_setting(
        db.pool(),
        "entitlement_state",
        &serde_json::json!({"packCredits": 17}),
    )
    .await
    .expect("write setting");
    db.close().await;

    let db = Database::new(&path).await.expect("reopen database");
    db.run_migrations().await.expect("migrations on reopen");
    let value = settings::get_setting(db.pool(), "entitlement_state")
        .await
        .expect("read setting");
    assert_eq!(value, Some(serde_json::json!({"packCredits": 17})));
}

#[tokio::test]
async fn test_grant_ledger_survives_reopen() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("lootlook.db");
    let txid = TransactionId::new("2000000123").expect("transaction id");

    let db = Database::new(&path).await.expect("open database");
    db.run_migrations().await.expect("run migrations");
    let now = Utc::now();
    let inserted = grants::record_grant(
        db.pool(),
        &GrantRecord {
            transaction_id: txid.clone(),
            product_id: ProductId::new("lootlook.pro.yearly").expect("product id"),
            kind: GrantKind::Subscription,
            credits: None,
            purchased_at: now,
            applied_at: now,
        },
    )
    .await
    .expect("record grant");
    assert!(inserted);
    db.close().await;

    let db = Database::new(&path).await.expect("reopen database");
    assert!(grants::has_grant(db.pool(), &txid).await.expect("query"));
    let all = grants::list_grants(db.pool()).await.expect("list");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].kind, GrantKind::Subscription);
    assert_eq!(all[0].credits, None);
}
