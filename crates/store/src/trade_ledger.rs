//! Append-only trade ledger.
//!
//! Records are keyed by execution (transaction hash), never by user: a user
//! accumulates many records over time. Appends are exactly-once per hash so
//! a retried executor run after an ambiguous outcome cannot duplicate a row.

use crate::database::{from_db_i64, to_db_i64, Database};
use chrono::{DateTime, Utc};
use perp_bot_core::{EngineError, Result, TradeKind, TradeRecord};
use sqlx::sqlite::SqlitePool;

type TradeRow = (
    i64,
    String,
    i64,
    i64,
    i64,
    i64,
    String,
    String,
    DateTime<Utc>,
);

#[derive(Clone)]
pub struct TradeLedger {
    pool: SqlitePool,
}

impl TradeLedger {
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Appends a trade record. Returns true if a row was inserted, false if
    /// a record with the same transaction hash already existed.
    ///
    /// # Errors
    /// Returns `Storage` if the write fails. Callers past settlement must
    /// re-wrap this with the transaction hash preserved.
    pub async fn append(&self, record: &TradeRecord) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO trades
                (tx_hash, uid, pair_type, size, avg_price, collateral,
                 take_profit_trigger_price, kind, executed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(tx_hash) DO NOTHING
            ",
        )
        .bind(&record.tx_hash)
        .bind(to_db_i64(record.uid, "uid")?)
        .bind(&record.pair_type)
        .bind(to_db_i64(record.size, "size")?)
        .bind(to_db_i64(record.avg_price, "avg_price")?)
        .bind(to_db_i64(record.collateral, "collateral")?)
        .bind(to_db_i64(
            record.take_profit_trigger_price,
            "take_profit_trigger_price",
        )?)
        .bind(record.kind.as_str())
        .bind(record.executed_at)
        .execute(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            tracing::info!(tx_hash = %record.tx_hash, kind = %record.kind, "trade recorded");
        } else {
            tracing::warn!(tx_hash = %record.tx_hash, "duplicate trade append skipped");
        }
        Ok(inserted)
    }

    /// All trade records in insertion order.
    ///
    /// # Errors
    /// Returns `Storage` if the read fails.
    pub async fn list_all(&self) -> Result<Vec<TradeRecord>> {
        let rows: Vec<TradeRow> = sqlx::query_as(
            r"
            SELECT uid, pair_type, size, avg_price, collateral,
                   take_profit_trigger_price, tx_hash, kind, executed_at
            FROM trades
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        rows.into_iter().map(row_to_record).collect()
    }

    /// Looks up a record by its transaction hash.
    ///
    /// # Errors
    /// Returns `Storage` if the read fails.
    pub async fn find_by_hash(&self, tx_hash: &str) -> Result<Option<TradeRecord>> {
        let row: Option<TradeRow> = sqlx::query_as(
            r"
            SELECT uid, pair_type, size, avg_price, collateral,
                   take_profit_trigger_price, tx_hash, kind, executed_at
            FROM trades
            WHERE tx_hash = ?1
            ",
        )
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        row.map(row_to_record).transpose()
    }
}

fn row_to_record(row: TradeRow) -> Result<TradeRecord> {
    let (uid, pair_type, size, avg_price, collateral, tp, tx_hash, kind, executed_at) = row;
    Ok(TradeRecord {
        uid: from_db_i64(uid, "uid")?,
        pair_type,
        size: from_db_i64(size, "size")?,
        avg_price: from_db_i64(avg_price, "avg_price")?,
        collateral: from_db_i64(collateral, "collateral")?,
        take_profit_trigger_price: from_db_i64(tp, "take_profit_trigger_price")?,
        tx_hash,
        kind: TradeKind::parse(&kind)
            .ok_or_else(|| EngineError::storage(format!("unknown trade kind {kind:?}")))?,
        executed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tx_hash: &str, kind: TradeKind) -> TradeRecord {
        TradeRecord {
            uid: 1,
            pair_type: "0x5ae::pair_types::BTC_USD".to_string(),
            size: 300_000_000,
            avg_price: 97_000_000_000,
            collateral: 10_000_000,
            take_profit_trigger_price: 116_400_000_000,
            tx_hash: tx_hash.to_string(),
            kind,
            executed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn append_deduplicates_by_tx_hash() {
        let db = Database::in_memory().await.unwrap();
        let ledger = TradeLedger::new(&db);

        assert!(ledger.append(&sample("0x1", TradeKind::Open)).await.unwrap());
        assert!(!ledger.append(&sample("0x1", TradeKind::Open)).await.unwrap());

        let all = ledger.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let db = Database::in_memory().await.unwrap();
        let ledger = TradeLedger::new(&db);

        ledger.append(&sample("0x1", TradeKind::Open)).await.unwrap();
        ledger.append(&sample("0x2", TradeKind::Close)).await.unwrap();
        ledger.append(&sample("0x3", TradeKind::Open)).await.unwrap();

        let hashes: Vec<String> = ledger
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.tx_hash)
            .collect();
        assert_eq!(hashes, vec!["0x1", "0x2", "0x3"]);
    }

    #[tokio::test]
    async fn find_by_hash_round_trips_fields() {
        let db = Database::in_memory().await.unwrap();
        let ledger = TradeLedger::new(&db);
        let record = sample("0xabc", TradeKind::Close);
        ledger.append(&record).await.unwrap();

        let found = ledger.find_by_hash("0xabc").await.unwrap().unwrap();
        assert_eq!(found.uid, record.uid);
        assert_eq!(found.size, record.size);
        assert_eq!(found.kind, TradeKind::Close);
        assert!(ledger.find_by_hash("0xmissing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn trades_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::connect(path).await.unwrap();
            let ledger = TradeLedger::new(&db);
            ledger.append(&sample("0x1", TradeKind::Open)).await.unwrap();
        }

        let db = Database::connect(path).await.unwrap();
        let ledger = TradeLedger::new(&db);
        assert_eq!(ledger.list_all().await.unwrap().len(), 1);
    }
}
