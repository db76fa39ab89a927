//! Commands invoked by the UI.
//!
//! Thin wrappers over the entitlement engine: each takes the engine lock,
//! performs one operation and returns a serializable result.

use crate::error::CommandError;
use crate::state::AppState;
use lootlook_entitlement::{EntitlementSummary, GrantOutcome, Purchase, RestoreReport};
use serde::Serialize;

/// Outcome of a scan authorization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanAuthorization {
    /// Whether the scan was paid for; `false` means show the paywall
    pub granted: bool,
    /// Entitlements after the attempt
    pub summary: EntitlementSummary,
}

/// Outcome of a purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResult {
    /// `false` if the transaction had already been applied
    pub applied: bool,
    /// Entitlements after the purchase
    pub summary: EntitlementSummary,
}

/// Current entitlements for UI affordances.
pub async fn get_entitlements(state: &AppState) -> EntitlementSummary {
    state.engine.lock().await.summary()
}

/// App foreground / session start: runs the monthly reset check.
pub async fn begin_session(state: &AppState) -> EntitlementSummary {
    let mut engine = state.engine.lock().await;
    engine.begin_session().await;
    engine.summary()
}

/// Pre-capture check. Does not debit anything.
pub async fn can_scan(state: &AppState) -> bool {
    state.engine.lock().await.can_scan()
}

/// Debit one scan after a successful capture.
pub async fn consume_scan(state: &AppState) -> ScanAuthorization {
    let mut engine = state.engine.lock().await;
    let granted = engine.consume_scan().await;
    if !granted {
        tracing::info!("Scan not authorized, paywall required");
    }
    ScanAuthorization {
        granted,
        summary: engine.summary(),
    }
}

/// The user finished watching a rewarded ad.
pub async fn reward_ad_watched(state: &AppState) -> EntitlementSummary {
    let mut engine = state.engine.lock().await;
    engine.add_rewarded_scan().await;
    engine.summary()
}

/// A store purchase was confirmed.
pub async fn complete_purchase(
    state: &AppState,
    purchase: Purchase,
) -> Result<PurchaseResult, CommandError> {
    let mut engine = state.engine.lock().await;
    let outcome = state
        .purchases
        .apply_purchase(&mut engine, &purchase)
        .await?;
    Ok(PurchaseResult {
        applied: matches!(outcome, GrantOutcome::Applied(_)),
        summary: engine.summary(),
    })
}

/// Re-apply the platform purchase history.
pub async fn restore_purchases(
    state: &AppState,
    history: Vec<Purchase>,
) -> Result<RestoreReport, CommandError> {
    let mut engine = state.engine.lock().await;
    let report = state.purchases.restore(&mut engine, &history).await?;
    Ok(report)
}

/// Developer utility: wipe all entitlement state.
pub async fn reset_entitlements(state: &AppState) -> Result<EntitlementSummary, CommandError> {
    let mut engine = state.engine.lock().await;
    engine.reset_all().await?;
    Ok(engine.summary())
}
