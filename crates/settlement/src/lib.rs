//! Settlement-layer integration for the perp trading bot.
//!
//! This crate provides:
//! - ed25519 account generation with deterministic address derivation
//! - REST client for signing and submitting market orders
//! - Bounded finality polling with injectable timeout and interval
//! - Read-only position and balance queries
//! - A scriptable mock client for engine tests
//!
//! The executor never depends on this crate's concrete types; everything is
//! reached through the `SettlementClient` trait in `perp-bot-core`.

pub mod account;
pub mod client;
pub mod mock;

pub use account::SettlementAccount;
pub use client::RestSettlementClient;
pub use mock::{MockBehavior, MockSettlementClient};
