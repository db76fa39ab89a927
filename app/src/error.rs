//! Error types for app commands.

use lootlook_core::ConfigError;
use lootlook_db::DatabaseError;
use lootlook_entitlement::EntitlementError;
use serde::Serialize;

/// Serializable error for the UI command layer.
#[derive(Debug, Serialize)]
pub struct CommandError {
    /// Error code for frontend handling (e.g., "UNKNOWN_PRODUCT")
    pub code: String,
    /// User-friendly error message
    pub message: String,
    /// Optional debugging context
    pub details: Option<serde_json::Value>,
}

impl CommandError {
    /// Create a new command error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create a command error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<EntitlementError> for CommandError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::UnknownProduct(product) => Self::with_details(
                "UNKNOWN_PRODUCT",
                "Product is not available",
                serde_json::json!({ "productId": product }),
            ),
            EntitlementError::Database(err) => Self::from(err),
            EntitlementError::Serialization(err) => Self::new(
                "CORRUPT_STATE",
                format!("Stored entitlement state is unreadable: {err}"),
            ),
            EntitlementError::InvalidConfiguration(msg) => {
                Self::new("INVALID_CONFIGURATION", format!("Invalid configuration: {msg}"))
            }
            EntitlementError::StoreUnavailable(msg) => {
                Self::new("STORE_UNAVAILABLE", format!("Storage unavailable: {msg}"))
            }
        }
    }
}

impl From<DatabaseError> for CommandError {
    fn from(err: DatabaseError) -> Self {
        Self::new("DATABASE_ERROR", format!("Database error: {err}"))
    }
}

impl From<ConfigError> for CommandError {
    fn from(err: ConfigError) -> Self {
        Self::new("CONFIG_ERROR", format!("Configuration error: {err}"))
    }
}
