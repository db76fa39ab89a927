//! Purchase and restore handling.
//!
//! Turns confirmed store transactions into engine grants. A pack's ledger
//! entry is written together with the credited state, so a replayed callback
//! or a restore never credits the same pack twice and a failed write never
//! marks an uncredited pack as applied.

use crate::catalog::{ProductCatalog, ProductKind};
use crate::engine::EntitlementEngine;
use crate::error::Result;
use chrono::{DateTime, Utc};
use lootlook_core::{ProductId, TransactionId};
use lootlook_db::{GrantKind, GrantRecord};
use serde::{Deserialize, Serialize};

/// A confirmed store transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    /// Platform transaction identifier
    pub transaction_id: TransactionId,
    /// Purchased product
    pub product_id: ProductId,
    /// When the platform recorded the purchase
    pub purchased_at: DateTime<Utc>,
}

/// Result of applying one purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The purchase was granted.
    Applied(ProductKind),
    /// The transaction had already been granted; nothing changed.
    AlreadyApplied,
}

/// What a restore changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    /// Pack credits added from transactions not seen before
    pub credits_restored: u32,
    /// Subscription re-activated, if any
    pub subscription: Option<ProductId>,
    /// Pro was active locally but history shows no live period
    pub subscription_deactivated: bool,
    /// Transactions skipped because their product is unknown
    pub unknown_products: Vec<ProductId>,
}

/// Applies purchases against a product catalog.
#[derive(Debug, Clone, Default)]
pub struct PurchaseFlow {
    catalog: ProductCatalog,
}

impl PurchaseFlow {
    /// Create a flow over `catalog`.
    #[must_use]
    pub fn new(catalog: ProductCatalog) -> Self {
        Self { catalog }
    }

    /// Grant a freshly confirmed purchase.
    ///
    /// Credit packs add their credits. Subscriptions activate Pro with an
    /// expiry one period from now. The ledger entry and the updated state are
    /// written together; if that write fails nothing is granted and the
    /// purchase can be applied again.
    ///
    /// # Errors
    /// Returns `UnknownProduct` for products outside the catalog, or a store
    /// error if the grant cannot be written.
    pub async fn apply_purchase(
        &self,
        engine: &mut EntitlementEngine,
        purchase: &Purchase,
    ) -> Result<GrantOutcome> {
        let kind = self.catalog.require(&purchase.product_id)?;
        let now = engine.now();
        let grant = grant_record(purchase, kind, now);

        let applied = match kind {
            ProductKind::CreditPack { credits } => {
                engine
                    .commit_grant(&grant, |state| state.add_pack_credits(credits))
                    .await?
            }
            ProductKind::Subscription { period } => {
                let product_id = purchase.product_id.clone();
                let expiry = period.expiry_from(now);
                engine
                    .commit_grant(&grant, |state| {
                        state.set_pro_subscription(true, Some(product_id), Some(expiry));
                    })
                    .await?
            }
        };

        if !applied {
            tracing::info!(
                "Purchase {} already applied, skipping",
                purchase.transaction_id
            );
            return Ok(GrantOutcome::AlreadyApplied);
        }

        tracing::info!(
            "Applied purchase {} of {}, tier now {}",
            purchase.transaction_id,
            purchase.product_id,
            engine.tier()
        );
        Ok(GrantOutcome::Applied(kind))
    }

    /// Re-apply grants from the platform's purchase history.
    ///
    /// Pack transactions missing from the ledger are credited. The
    /// subscription whose period (counted from its purchase time) ends last
    /// and is still running re-activates Pro; if none is running and Pro is
    /// active locally, Pro is deactivated.
    ///
    /// # Errors
    /// Returns a store error if a grant or the subscription change cannot be
    /// written. Packs credited before the failure stay credited.
    pub async fn restore(
        &self,
        engine: &mut EntitlementEngine,
        history: &[Purchase],
    ) -> Result<RestoreReport> {
        let now = engine.now();
        let mut report = RestoreReport::default();
        let mut live: Option<(&Purchase, DateTime<Utc>)> = None;

        for purchase in history {
            let Some(kind) = self.catalog.get(&purchase.product_id) else {
                tracing::warn!(
                    "Skipping restore of unknown product {}",
                    purchase.product_id
                );
                report.unknown_products.push(purchase.product_id.clone());
                continue;
            };

            let grant = grant_record(purchase, kind, now);
            match kind {
                ProductKind::CreditPack { credits } => {
                    if engine
                        .commit_grant(&grant, |state| state.add_pack_credits(credits))
                        .await?
                    {
                        report.credits_restored = report.credits_restored.saturating_add(credits);
                    }
                }
                ProductKind::Subscription { period } => {
                    engine.store().record_grant(&grant).await?;
                    let expiry = period.expiry_from(purchase.purchased_at);
                    if expiry > now && live.map_or(true, |(_, best)| expiry > best) {
                        live = Some((purchase, expiry));
                    }
                }
            }
        }

        match live {
            Some((purchase, expiry)) => {
                let product_id = purchase.product_id.clone();
                engine
                    .commit(|state| {
                        state.set_pro_subscription(true, Some(product_id), Some(expiry));
                    })
                    .await?;
                report.subscription = Some(purchase.product_id.clone());
            }
            None if engine.state().pro_subscription_active => {
                engine
                    .commit(|state| state.set_pro_subscription(false, None, None))
                    .await?;
                report.subscription_deactivated = true;
            }
            None => {}
        }

        tracing::info!(
            "Restore complete: {} credits, subscription {:?}",
            report.credits_restored,
            report.subscription
        );
        Ok(report)
    }
}

fn grant_record(purchase: &Purchase, kind: ProductKind, now: DateTime<Utc>) -> GrantRecord {
    let (grant_kind, credits) = match kind {
        ProductKind::CreditPack { credits } => (GrantKind::CreditPack, Some(credits)),
        ProductKind::Subscription { .. } => (GrantKind::Subscription, None),
    };
    GrantRecord {
        transaction_id: purchase.transaction_id.clone(),
        product_id: purchase.product_id.clone(),
        kind: grant_kind,
        credits,
        purchased_at: purchase.purchased_at,
        applied_at: now,
    }
}
