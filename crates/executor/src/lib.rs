//! Trade-lifecycle engine.
//!
//! One execution takes a user's custodied credentials and a trade intent
//! through submit, finality, reconciliation, and the durable ledger write.
//! Side effects are confined to three points: the remote submission, the
//! post-settlement position read, and the local ledger append.

pub mod executor;
mod in_flight;

pub use executor::TradeExecutor;
