//! Key/value settings storage.
//!
//! Values are stored as JSON text in the `settings` table, so each named
//! record can carry its own schema.

use crate::error::{DatabaseError, Result};
use serde_json::Value;
use sqlx::{Sqlite, SqlitePool};

/// Insert or replace a setting.
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &Value) -> Result<()> {
    upsert_setting(pool, key, value).await
}

pub(crate) async fn upsert_setting<'e, E>(executor: E, key: &str, value: &Value) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let value_str = serde_json::to_string(value)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

    sqlx::query(
        r"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = datetime('now')
        ",
    )
    .bind(key)
    .bind(value_str)
    .execute(executor)
    .await?;

    Ok(())
}

/// Get a setting, `None` if it was never written.
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<Value>> {
    let row: Option<(String,)> = sqlx::query_as(
        r"
        SELECT value
        FROM settings
        WHERE key = ?
        ",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((value_str,)) => {
            let value: Value = serde_json::from_str(&value_str)
                .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Delete a setting. Deleting a missing key is not an error.
pub async fn delete_setting(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query(
        r"
        DELETE FROM settings
        WHERE key = ?
        ",
    )
    .bind(key)
    .execute(pool)
    .await?;

    Ok(())
}
