//! LootLook Entitlements - scan authorization and credit accounting
//!
//! This crate provides the Entitlement Engine, the single authority the
//! capture flow consults before and after every scan. It tracks four credit
//! sources and debits them in a fixed order:
//!
//! 1. **Pro subscription**: uncapped, nothing debited
//! 2. **Rewarded-ad bonus scans**: earned by watching an ad
//! 3. **Pack credits**: purchased consumables
//! 4. **Free monthly scans**: reset lazily on the first call in a new
//!    calendar month
//!
//! State is loaded once from an [`EntitlementStore`] and written back after
//! every mutation. The tier shown to the user (Free, `PackHolder`,
//! `ProSubscriber`) is derived from the counters, never stored separately.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lootlook_entitlement::{EntitlementEngine, SqliteStore, SystemClock};
//!
//! let store = Arc::new(SqliteStore::new(pool));
//! let mut engine = EntitlementEngine::load(store, Arc::new(SystemClock), 5).await?;
//!
//! engine.begin_session().await;
//! if engine.can_scan() {
//!     // capture and upload ...
//!     engine.consume_scan().await;
//! } else {
//!     // present the paywall
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

/// Product catalog and subscription periods.
pub mod catalog;
/// Wall-clock abstraction.
pub mod clock;
/// Entitlement engine.
pub mod engine;
/// Error types for entitlement operations.
pub mod error;
/// Purchase and restore flows.
pub mod purchases;
/// Entitlement state and derived tier.
pub mod state;
/// Persistence adapters.
pub mod store;

pub use catalog::{ProductCatalog, ProductKind, SubscriptionPeriod};
pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{EntitlementEngine, DEFAULT_FREE_MONTHLY_SCANS};
pub use error::{EntitlementError, Result};
pub use purchases::{GrantOutcome, Purchase, PurchaseFlow, RestoreReport};
pub use state::{CreditSource, EntitlementState, EntitlementSummary, Tier};
pub use store::{EntitlementStore, MemoryStore, SqliteStore, ENTITLEMENT_STATE_KEY};
