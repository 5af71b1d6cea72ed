//! Durable storage for the perp trading bot.
//!
//! Two collections, both on one SQLite file: wallet records keyed by user id
//! (create-once, immutable) and the trade ledger (append-only, deduplicated
//! by transaction hash). Both survive process restart.

pub mod database;
pub mod trade_ledger;
pub mod wallet_store;

pub use database::Database;
pub use trade_ledger::TradeLedger;
pub use wallet_store::WalletStore;
