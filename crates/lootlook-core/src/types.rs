//! Shared identifier newtypes.

use crate::error::LootlookError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Store product identifier, e.g. `lootlook.pack.20`.
///
/// Product IDs are lowercase reverse-DNS style: at least two dot-separated
/// segments of `[a-z0-9_-]`, 3-100 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    /// Create a new `ProductId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self, LootlookError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), LootlookError> {
        static PRODUCT_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = PRODUCT_REGEX.get_or_init(|| {
            Regex::new(r"^[a-z0-9][a-z0-9_-]*(\.[a-z0-9][a-z0-9_-]*)+$").expect("valid regex")
        });

        if id.len() < 3 || id.len() > 100 {
            return Err(LootlookError::Validation(format!(
                "invalid product ID: must be 3-100 characters, got {} characters",
                id.len()
            )));
        }

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(LootlookError::Validation(format!(
                "invalid product ID: must be lowercase dot-separated segments, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ProductId {
    type Error = LootlookError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

/// Platform purchase transaction identifier.
///
/// Opaque to LootLook; only required to be non-empty, whitespace-free and at
/// most 128 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    /// Create a new `TransactionId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is empty, too long or contains whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, LootlookError> {
        let id = id.into();
        if id.is_empty() || id.len() > 128 {
            return Err(LootlookError::Validation(format!(
                "invalid transaction ID: must be 1-128 characters, got {} characters",
                id.len()
            )));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(LootlookError::Validation(format!(
                "invalid transaction ID: must not contain whitespace, got '{id}'"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = LootlookError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}
