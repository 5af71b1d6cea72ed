use perp_bot_core::{EngineError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// `SQLite` database shared by the wallet store and the trade ledger.
///
/// The schema is fixed and created idempotently at connect time.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if missing) the database file at `path`.
    ///
    /// # Errors
    /// Returns `Storage` if the file cannot be opened or the schema cannot
    /// be created.
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(EngineError::storage)?;

        Self::init_schema(&pool).await?;
        tracing::info!(path, "database ready");
        Ok(Self { pool })
    }

    /// Creates an in-memory database for testing.
    ///
    /// # Errors
    /// Returns `Storage` if the connection fails.
    pub async fn in_memory() -> Result<Self> {
        // A pool of one: each in-memory connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(EngineError::storage)?;

        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS wallets (
                user_id         TEXT PRIMARY KEY,
                address         TEXT NOT NULL,
                private_key_hex TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )
            ",
        )
        .execute(pool)
        .await
        .map_err(EngineError::storage)?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS trades (
                id                        INTEGER PRIMARY KEY AUTOINCREMENT,
                tx_hash                   TEXT NOT NULL UNIQUE,
                uid                       INTEGER NOT NULL,
                pair_type                 TEXT NOT NULL,
                size                      INTEGER NOT NULL,
                avg_price                 INTEGER NOT NULL,
                collateral                INTEGER NOT NULL,
                take_profit_trigger_price INTEGER NOT NULL,
                kind                      TEXT NOT NULL,
                executed_at               TEXT NOT NULL
            )
            ",
        )
        .execute(pool)
        .await
        .map_err(EngineError::storage)?;

        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Converts a settlement-native u64 into the i64 `SQLite` stores.
pub(crate) fn to_db_i64(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| EngineError::storage(format!("{field} {value} exceeds storable range")))
}

/// Converts a stored i64 back into the settlement-native u64.
pub(crate) fn from_db_i64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| EngineError::storage(format!("stored {field} {value} is negative")))
}
