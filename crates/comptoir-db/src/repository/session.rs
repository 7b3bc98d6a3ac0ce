//! # Session Repository
//!
//! Per-visitor state stored as JSON values under a `(session_id, key)` pair.
//!
//! ## Keys
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ key          │ value                                        │
//! ├──────────────┼──────────────────────────────────────────────┤
//! │ "cart"       │ [{"product_id":"…","quantity":2}, …]         │
//! │ "checkout"   │ {"step":"carrier_chosen","address_id":…}     │
//! │ "user"       │ "user-uuid"                                  │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Writes are last-writer-wins per key. Callers that read, modify and
//! write back serialize on the session themselves.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Cart lines.
pub const CART_KEY: &str = "cart";
/// Checkout progress.
pub const CHECKOUT_KEY: &str = "checkout";
/// Authenticated user id.
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Reads and decodes a value.
    ///
    /// ## Returns
    /// * `Ok(None)` - Key never written
    /// * `Err(DbError::Serialization)` - Stored JSON doesn't match `T`
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        session_id: &str,
        key: &str,
    ) -> DbResult<Option<T>> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT value FROM session_values WHERE session_id = ?1 AND key = ?2",
        )
        .bind(session_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encodes and stores a value, replacing any previous one.
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        session_id: &str,
        key: &str,
        value: &T,
    ) -> DbResult<()> {
        let raw = serde_json::to_string(value)?;

        sqlx::query(
            r#"
            INSERT INTO session_values (session_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (session_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(key)
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, session_id: &str, key: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM session_values WHERE session_id = ?1 AND key = ?2")
            .bind(session_id)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Removes several keys at once.
    pub async fn delete_keys(&self, session_id: &str, keys: &[&str]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for key in keys {
            sqlx::query("DELETE FROM session_values WHERE session_id = ?1 AND key = ?2")
                .bind(session_id)
                .bind(*key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Carries `keys` over to a new session id and drops everything else
    /// stored under the old one, in one transaction.
    pub async fn migrate(&self, from: &str, to: &str, keys: &[&str]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for key in keys {
            sqlx::query("UPDATE session_values SET session_id = ?2 WHERE session_id = ?1 AND key = ?3")
                .bind(from)
                .bind(to)
                .bind(*key)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM session_values WHERE session_id = ?1")
            .bind(from)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(from = %from, to = %to, "Session migrated");
        Ok(())
    }

    /// Drops the whole session (logout).
    pub async fn destroy(&self, session_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM session_values WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deletes values not written since `cutoff`. Returns how many rows went.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM session_values WHERE updated_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        debug!(purged = result.rows_affected(), "Purged stale session values");
        Ok(result.rows_affected())
    }
}
