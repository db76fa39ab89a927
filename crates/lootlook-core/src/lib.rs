//! LootLook Core - Foundation crate for the LootLook scanner application.
//!
//! This crate provides the configuration, error types and identifier newtypes
//! that the other LootLook crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes (`ProductId`, `TransactionId`)
//!
//! # Example
//!
//! ```rust
//! use lootlook_core::AppConfig;
//!
//! let config = AppConfig::default();
//! assert_eq!(config.entitlements.free_monthly_scans, 5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, CatalogConfig, EntitlementConfig, GeneralConfig};
pub use error::{ConfigError, ConfigResult, LootlookError, Result};
pub use types::{ProductId, TransactionId};
