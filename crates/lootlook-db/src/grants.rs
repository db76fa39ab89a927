//! Grant ledger: purchase transactions already turned into entitlements.
//!
//! The ledger keys on the platform transaction ID so a purchase replayed by
//! a restore or a duplicate store callback is only credited once.

use crate::error::{DatabaseError, Result};
use crate::settings;
use chrono::{DateTime, Utc};
use lootlook_core::{ProductId, TransactionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Sqlite, SqlitePool};

/// What a ledger entry granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantKind {
    /// Consumable scan credits
    CreditPack,
    /// Pro subscription period
    Subscription,
}

impl std::fmt::Display for GrantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreditPack => write!(f, "CreditPack"),
            Self::Subscription => write!(f, "Subscription"),
        }
    }
}

impl std::str::FromStr for GrantKind {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CreditPack" => Ok(Self::CreditPack),
            "Subscription" => Ok(Self::Subscription),
            other => Err(DatabaseError::Decode(format!(
                "Invalid kind '{other}' in grant_ledger table"
            ))),
        }
    }
}

/// One applied purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    /// Platform transaction identifier
    pub transaction_id: TransactionId,
    /// Product that was purchased
    pub product_id: ProductId,
    /// Kind of entitlement granted
    pub kind: GrantKind,
    /// Credits granted (credit packs only)
    pub credits: Option<u32>,
    /// When the platform says the purchase happened
    pub purchased_at: DateTime<Utc>,
    /// When the grant was applied locally
    pub applied_at: DateTime<Utc>,
}

type GrantRow = (String, String, String, Option<i64>, String, String);

fn decode_row(row: GrantRow) -> Result<GrantRecord> {
    let (transaction_id, product_id, kind, credits, purchased_at, applied_at) = row;

    let parse_time = |field: &str, value: &str| {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DatabaseError::Decode(format!("Invalid {field} '{value}': {e}")))
    };

    let credits = credits
        .map(u32::try_from)
        .transpose()
        .map_err(|e| DatabaseError::Decode(format!("Invalid credits value: {e}")))?;

    Ok(GrantRecord {
        transaction_id: TransactionId::new(transaction_id)
            .map_err(|e| DatabaseError::Decode(e.to_string()))?,
        product_id: ProductId::new(product_id).map_err(|e| DatabaseError::Decode(e.to_string()))?,
        kind: kind.parse()?,
        credits,
        purchased_at: parse_time("purchased_at", &purchased_at)?,
        applied_at: parse_time("applied_at", &applied_at)?,
    })
}

/// Record a grant.
///
/// Returns `true` if the transaction was new, `false` if it was already in
/// the ledger (in which case nothing is written).
pub async fn record_grant(pool: &SqlitePool, grant: &GrantRecord) -> Result<bool> {
    insert_grant(pool, grant).await
}

/// Record a grant and replace setting `key` with `value` in one transaction.
///
/// Either both rows land or neither does. Returns `false`, leaving the
/// setting untouched, if the transaction was already in the ledger.
pub async fn record_grant_with_setting(
    pool: &SqlitePool,
    grant: &GrantRecord,
    key: &str,
    value: &Value,
) -> Result<bool> {
    let mut tx = pool.begin().await?;

    if !insert_grant(&mut *tx, grant).await? {
        tx.rollback().await?;
        return Ok(false);
    }
    if let Err(e) = settings::upsert_setting(&mut *tx, key, value).await {
        tx.rollback().await?;
        return Err(e);
    }

    tx.commit().await?;
    Ok(true)
}

async fn insert_grant<'e, E>(executor: E, grant: &GrantRecord) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT OR IGNORE INTO grant_ledger
            (transaction_id, product_id, kind, credits, purchased_at, applied_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(grant.transaction_id.as_str())
    .bind(grant.product_id.as_str())
    .bind(grant.kind.to_string())
    .bind(grant.credits.map(i64::from))
    .bind(grant.purchased_at.to_rfc3339())
    .bind(grant.applied_at.to_rfc3339())
    .execute(executor)
    .await?;

    let inserted = result.rows_affected() == 1;
    if !inserted {
        tracing::debug!(
            "Transaction {} already in grant ledger",
            grant.transaction_id
        );
    }
    Ok(inserted)
}

/// Check whether a transaction has already been applied.
pub async fn has_grant(pool: &SqlitePool, transaction_id: &TransactionId) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM grant_ledger WHERE transaction_id = ?")
            .bind(transaction_id.as_str())
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// List all grants, oldest purchase first.
pub async fn list_grants(pool: &SqlitePool) -> Result<Vec<GrantRecord>> {
    let rows: Vec<GrantRow> = sqlx::query_as(
        "SELECT transaction_id, product_id, kind, credits, purchased_at, applied_at
         FROM grant_ledger
         ORDER BY purchased_at ASC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(decode_row).collect()
}

/// Remove every ledger entry. Returns the number of rows deleted.
pub async fn clear_grants(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM grant_ledger").execute(pool).await?;
    Ok(result.rows_affected())
}
