use thiserror::Error;

/// Error types for entitlement persistence and purchase handling.
///
/// Scan eligibility is never an error; see `EntitlementEngine::consume_scan`.
#[derive(Debug, Error)]
pub enum EntitlementError {
    /// Database layer error.
    #[error("Database error: {0}")]
    Database(#[from] lootlook_db::DatabaseError),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Product is not in the catalog.
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// Invalid catalog or identifier.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Store rejected the write (test doubles and adapters without a database).
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<lootlook_core::LootlookError> for EntitlementError {
    fn from(err: lootlook_core::LootlookError) -> Self {
        Self::InvalidConfiguration(err.to_string())
    }
}

/// Result type alias for entitlement operations.
pub type Result<T> = std::result::Result<T, EntitlementError>;
