use chrono::{DateTime, Datelike, Utc};
use lootlook_core::ProductId;
use serde::{Deserialize, Serialize};

/// Monetization classification, derived from the credit counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// No subscription and no pack credits
    Free,
    /// Holds purchased pack credits
    PackHolder,
    /// Active Pro subscription
    ProSubscriber,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "Free"),
            Self::PackHolder => write!(f, "PackHolder"),
            Self::ProSubscriber => write!(f, "ProSubscriber"),
        }
    }
}

/// The credit source that paid for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditSource {
    /// Covered by the Pro subscription, nothing debited
    Subscription,
    /// One rewarded-ad bonus scan
    RewardedAd,
    /// One purchased pack credit
    Pack,
    /// One of the free monthly scans
    FreeMonthly,
}

/// Authorization state for one installation.
///
/// Counters are authoritative. The tier is computed from them on demand and
/// only appears in the persisted record for readers of that record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "EntitlementRecord", from = "EntitlementRecord")]
pub struct EntitlementState {
    /// Free scans used since `free_scans_reset_at`
    pub free_scans_used_this_month: u32,
    /// When the free allotment was last reset
    pub free_scans_reset_at: DateTime<Utc>,
    /// Purchased scan credits
    pub pack_credits: u32,
    /// Whether a Pro subscription is in its paid period
    pub pro_subscription_active: bool,
    /// End of the current Pro period, informational
    pub pro_subscription_expiry: Option<DateTime<Utc>>,
    /// Store product of the active subscription, informational
    pub pro_subscription_product_id: Option<ProductId>,
    /// Scans earned by watching rewarded ads
    pub rewarded_ad_bonus_scans: u32,
}

impl EntitlementState {
    /// First-run state: nothing used, nothing purchased.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            free_scans_used_this_month: 0,
            free_scans_reset_at: now,
            pack_credits: 0,
            pro_subscription_active: false,
            pro_subscription_expiry: None,
            pro_subscription_product_id: None,
            rewarded_ad_bonus_scans: 0,
        }
    }

    /// Current tier: Pro if subscribed, else `PackHolder` with credits, else Free.
    #[must_use]
    pub fn tier(&self) -> Tier {
        if self.pro_subscription_active {
            Tier::ProSubscriber
        } else if self.pack_credits > 0 {
            Tier::PackHolder
        } else {
            Tier::Free
        }
    }

    /// Free scans left this month under `allotment`.
    #[must_use]
    pub fn remaining_free_scans(&self, allotment: u32) -> u32 {
        allotment.saturating_sub(self.free_scans_used_this_month)
    }

    /// Whether any credit source could pay for a scan.
    #[must_use]
    pub fn can_scan(&self, allotment: u32) -> bool {
        self.pro_subscription_active
            || self.pack_credits > 0
            || self.remaining_free_scans(allotment) > 0
            || self.rewarded_ad_bonus_scans > 0
    }

    /// Whether ads should be shown for the current tier.
    #[must_use]
    pub fn should_show_ads(&self) -> bool {
        self.tier() == Tier::Free
    }

    /// Whether `now` falls in a different calendar month than the last reset.
    #[must_use]
    pub fn needs_monthly_reset(&self, now: DateTime<Utc>) -> bool {
        now.year() != self.free_scans_reset_at.year()
            || now.month() != self.free_scans_reset_at.month()
    }

    /// Reset the free allotment if the month rolled over. Returns `true` if it did.
    pub fn reset_monthly_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if !self.needs_monthly_reset(now) {
            return false;
        }
        self.free_scans_used_this_month = 0;
        self.free_scans_reset_at = now;
        true
    }

    /// Debit one scan from the first available source.
    ///
    /// Order: subscription, rewarded-ad bonus, pack credits, free monthly.
    /// Returns `None` and leaves the state untouched when nothing can pay.
    pub fn consume(&mut self, allotment: u32) -> Option<CreditSource> {
        if self.pro_subscription_active {
            return Some(CreditSource::Subscription);
        }
        if self.rewarded_ad_bonus_scans > 0 {
            self.rewarded_ad_bonus_scans -= 1;
            return Some(CreditSource::RewardedAd);
        }
        if self.pack_credits > 0 {
            self.pack_credits -= 1;
            return Some(CreditSource::Pack);
        }
        if self.remaining_free_scans(allotment) > 0 {
            self.free_scans_used_this_month += 1;
            return Some(CreditSource::FreeMonthly);
        }
        None
    }

    /// Add purchased pack credits.
    pub fn add_pack_credits(&mut self, credits: u32) {
        self.pack_credits = self.pack_credits.saturating_add(credits);
    }

    /// Add one rewarded-ad bonus scan.
    pub fn add_rewarded_scan(&mut self) {
        self.rewarded_ad_bonus_scans = self.rewarded_ad_bonus_scans.saturating_add(1);
    }

    /// Replace the subscription fields.
    pub fn set_pro_subscription(
        &mut self,
        active: bool,
        product_id: Option<ProductId>,
        expiry: Option<DateTime<Utc>>,
    ) {
        self.pro_subscription_active = active;
        self.pro_subscription_product_id = product_id;
        self.pro_subscription_expiry = expiry;
    }

    /// Whether the recorded Pro expiry is in the past while Pro is still active.
    #[must_use]
    pub fn subscription_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.pro_subscription_active && self.pro_subscription_expiry.is_some_and(|exp| exp <= now)
    }
}

/// Persisted layout of [`EntitlementState`] (key `entitlement_state`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitlementRecord {
    tier: Tier,
    free_scans_used_this_month: u32,
    free_scans_reset_at: DateTime<Utc>,
    pack_credits: u32,
    pro_subscription_active: bool,
    pro_subscription_expiry: Option<DateTime<Utc>>,
    pro_subscription_product_id: Option<ProductId>,
    rewarded_ad_bonus_scans: u32,
}

impl From<EntitlementState> for EntitlementRecord {
    fn from(state: EntitlementState) -> Self {
        Self {
            tier: state.tier(),
            free_scans_used_this_month: state.free_scans_used_this_month,
            free_scans_reset_at: state.free_scans_reset_at,
            pack_credits: state.pack_credits,
            pro_subscription_active: state.pro_subscription_active,
            pro_subscription_expiry: state.pro_subscription_expiry,
            pro_subscription_product_id: state.pro_subscription_product_id,
            rewarded_ad_bonus_scans: state.rewarded_ad_bonus_scans,
        }
    }
}

impl From<EntitlementRecord> for EntitlementState {
    fn from(record: EntitlementRecord) -> Self {
        // The stored tier is ignored; it is recomputed from the counters.
        Self {
            free_scans_used_this_month: record.free_scans_used_this_month,
            free_scans_reset_at: record.free_scans_reset_at,
            pack_credits: record.pack_credits,
            pro_subscription_active: record.pro_subscription_active,
            pro_subscription_expiry: record.pro_subscription_expiry,
            pro_subscription_product_id: record.pro_subscription_product_id,
            rewarded_ad_bonus_scans: record.rewarded_ad_bonus_scans,
        }
    }
}

/// Snapshot for UI affordances (scan button, paywall, ad slots).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementSummary {
    /// Current tier
    pub tier: Tier,
    /// Whether a scan is currently allowed
    pub can_scan: bool,
    /// Free scans left this month
    pub remaining_free_scans: u32,
    /// Free scans granted each month
    pub free_monthly_scans: u32,
    /// Purchased credits
    pub pack_credits: u32,
    /// Rewarded-ad bonus scans
    pub rewarded_ad_bonus_scans: u32,
    /// Whether to show ads
    pub show_ads: bool,
    /// Whether Pro is active
    pub pro_subscription_active: bool,
    /// Pro period end, if known
    pub pro_subscription_expiry: Option<DateTime<Utc>>,
}

impl EntitlementSummary {
    /// Build a summary of `state` under `allotment`.
    #[must_use]
    pub fn of(state: &EntitlementState, allotment: u32) -> Self {
        Self {
            tier: state.tier(),
            can_scan: state.can_scan(allotment),
            remaining_free_scans: state.remaining_free_scans(allotment),
            free_monthly_scans: allotment,
            pack_credits: state.pack_credits,
            rewarded_ad_bonus_scans: state.rewarded_ad_bonus_scans,
            show_ads: state.should_show_ads(),
            pro_subscription_active: state.pro_subscription_active,
            pro_subscription_expiry: state.pro_subscription_expiry,
        }
    }
}
