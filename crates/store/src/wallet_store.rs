//! Wallet records keyed by user id.
//!
//! Key material is generated exactly once per user and never regenerated.
//! Concurrent first-time calls converge on a single stored record: the insert
//! is `ON CONFLICT DO NOTHING`, and every caller reads back the stored row,
//! never its own losing candidate.

use crate::database::Database;
use chrono::Utc;
use perp_bot_core::{EngineError, Result, WalletRecord};
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct WalletStore {
    pool: SqlitePool,
}

impl WalletStore {
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Returns the wallet record for a user, if one exists.
    ///
    /// # Errors
    /// Returns `Storage` if the backing store cannot be read.
    pub async fn get(&self, user_id: &str) -> Result<Option<WalletRecord>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT user_id, address, private_key_hex FROM wallets WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        Ok(row.map(|(user_id, address, private_key_hex)| WalletRecord {
            user_id,
            address,
            private_key_hex,
        }))
    }

    /// Returns the existing record or persists the one produced by
    /// `generate`. The boolean is true when this call created the record.
    ///
    /// At-most-one-creation: if another caller wins the insert race, the
    /// generated candidate is discarded and the stored record is returned.
    ///
    /// # Errors
    /// Returns `Storage` if the backing store cannot be read or written; no
    /// partial wallet state is ever visible.
    pub async fn get_or_create<F>(
        &self,
        user_id: &str,
        generate: F,
    ) -> Result<(WalletRecord, bool)>
    where
        F: FnOnce() -> WalletRecord,
    {
        if let Some(existing) = self.get(user_id).await? {
            return Ok((existing, false));
        }

        let candidate = generate();
        let result = sqlx::query(
            r"
            INSERT INTO wallets (user_id, address, private_key_hex, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(&candidate.address)
        .bind(&candidate.private_key_hex)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        let created = result.rows_affected() > 0;
        if created {
            tracing::info!(user_id, address = %candidate.address, "wallet created");
        }

        let stored = self
            .get(user_id)
            .await?
            .ok_or_else(|| EngineError::storage("wallet vanished after insert"))?;
        Ok((stored, created))
    }
}
