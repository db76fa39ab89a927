//! In-app product catalog.
//!
//! Maps store product IDs to what they grant: a fixed number of scan
//! credits, or a Pro subscription period.

use crate::error::{EntitlementError, Result};
use chrono::{DateTime, Months, Utc};
use lootlook_core::{CatalogConfig, ProductId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Billing period of a Pro subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubscriptionPeriod {
    /// One calendar month
    Monthly,
    /// One calendar year
    Yearly,
}

impl SubscriptionPeriod {
    /// End of a period starting at `start`.
    ///
    /// Adds calendar months, clamping to the last day of the target month
    /// (Jan 31 + 1 month = Feb 28/29).
    #[must_use]
    pub fn expiry_from(self, start: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            Self::Monthly => Months::new(1),
            Self::Yearly => Months::new(12),
        };
        start.checked_add_months(months).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// What a product grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProductKind {
    /// Consumable scan credits
    CreditPack {
        /// Credits added per purchase
        credits: u32,
    },
    /// Auto-renewing Pro subscription
    Subscription {
        /// Billing period
        period: SubscriptionPeriod,
    },
}

/// Known products, keyed by store product ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCatalog {
    products: BTreeMap<ProductId, ProductKind>,
}

impl ProductCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            products: BTreeMap::new(),
        }
    }

    /// Build the reference catalog (20 and 100 credit packs, monthly and
    /// yearly Pro) with the product IDs from `config`.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if an ID is malformed or used twice.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let mut catalog = Self::empty();
        catalog.insert(&config.pack_small, ProductKind::CreditPack { credits: 20 })?;
        catalog.insert(&config.pack_large, ProductKind::CreditPack { credits: 100 })?;
        catalog.insert(
            &config.pro_monthly,
            ProductKind::Subscription {
                period: SubscriptionPeriod::Monthly,
            },
        )?;
        catalog.insert(
            &config.pro_yearly,
            ProductKind::Subscription {
                period: SubscriptionPeriod::Yearly,
            },
        )?;
        Ok(catalog)
    }

    /// Add a product.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the ID is malformed, already present,
    /// or a credit pack grants zero credits.
    pub fn insert(&mut self, product_id: &str, kind: ProductKind) -> Result<()> {
        let id = ProductId::new(product_id)?;
        if matches!(kind, ProductKind::CreditPack { credits: 0 }) {
            return Err(EntitlementError::InvalidConfiguration(format!(
                "credit pack {id} grants no credits"
            )));
        }
        if self.products.contains_key(&id) {
            return Err(EntitlementError::InvalidConfiguration(format!(
                "duplicate product id {id}"
            )));
        }
        self.products.insert(id, kind);
        Ok(())
    }

    /// Look up a product.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<ProductKind> {
        self.products.get(product_id).copied()
    }

    /// Look up a product, failing with `UnknownProduct`.
    pub fn require(&self, product_id: &ProductId) -> Result<ProductKind> {
        self.get(product_id)
            .ok_or_else(|| EntitlementError::UnknownProduct(product_id.to_string()))
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        // The default config only holds valid, distinct IDs.
        Self::from_config(&CatalogConfig::default()).unwrap_or_else(|_| Self::empty())
    }
}
