//! Domain types shared across the trade-lifecycle engine.
//!
//! Positions are remote-authoritative snapshots and must be re-fetched after
//! every state-changing submission. Trade records are immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed asset-pair identifier.
///
/// Only `BtcUsd` is configured for trading today, but matching against
/// on-chain type tags is exact rather than suffix-based so additional pairs
/// cannot conflate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pair {
    BtcUsd,
}

impl Pair {
    /// Returns the canonical pair symbol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BtcUsd => "BTC_USD",
        }
    }

    /// Parses a canonical pair symbol.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BTC_USD" => Some(Self::BtcUsd),
            _ => None,
        }
    }

    /// Returns true if a fully qualified on-chain type tag refers to this pair.
    ///
    /// The final `::`-separated segment must equal the pair symbol exactly.
    /// A bare symbol without module path also matches.
    #[must_use]
    pub fn matches_type_tag(self, type_tag: &str) -> bool {
        type_tag.rsplit("::").next() == Some(self.as_str())
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a trade execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Open,
    Close,
}

impl TradeKind {
    /// Returns the string representation used in the ledger and gateways.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "close" => Some(Self::Close),
            _ => None,
        }
    }
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ephemeral market-order intent, constructed per execution.
///
/// Sizes are integer fixed-point in the settlement layer's native units
/// (micro-USDC for collateral).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub kind: TradeKind,
    pub pair: Pair,
    pub size_delta: u64,
    pub collateral_delta: u64,
    pub is_long: bool,
    pub is_increase: bool,
}

impl OrderIntent {
    /// Builds a long open intent with the configured size and collateral.
    #[must_use]
    pub const fn open(pair: Pair, size_delta: u64, collateral_delta: u64) -> Self {
        Self {
            kind: TradeKind::Open,
            pair,
            size_delta,
            collateral_delta,
            is_long: true,
            is_increase: true,
        }
    }

    /// Builds a full-close intent from the currently held position.
    #[must_use]
    pub const fn close_from(pair: Pair, position: &Position) -> Self {
        Self {
            kind: TradeKind::Close,
            pair,
            size_delta: position.size,
            collateral_delta: position.collateral,
            is_long: position.is_long,
            is_increase: false,
        }
    }
}

/// Remote-authoritative position snapshot.
///
/// The engine never owns this state; it is read from the settlement layer and
/// never assumed valid across a submission boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub uid: u64,
    pub pair_type: String,
    pub size: u64,
    pub collateral: u64,
    pub avg_price: u64,
    pub is_long: bool,
    pub take_profit_trigger_price: u64,
}

impl Position {
    /// Returns true if the position carries no remaining size.
    #[must_use]
    pub const fn is_flat(&self) -> bool {
        self.size == 0
    }
}

/// Handle to a submitted transaction, returned before finality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
    pub hash: String,
}

impl TxHandle {
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
}

/// Entry-function payload submitted to the settlement layer.
///
/// Opaque to the executor; only the settlement client interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFunctionPayload {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<serde_json::Value>,
}

/// Durable, immutable record of one completed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub uid: u64,
    pub pair_type: String,
    pub size: u64,
    pub avg_price: u64,
    pub collateral: u64,
    pub take_profit_trigger_price: u64,
    pub tx_hash: String,
    pub kind: TradeKind,
    pub executed_at: DateTime<Utc>,
}

impl TradeRecord {
    /// Builds a record from the reconciled position snapshot and the settled
    /// transaction hash.
    #[must_use]
    pub fn from_position(
        position: &Position,
        tx_hash: impl Into<String>,
        kind: TradeKind,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: position.uid,
            pair_type: position.pair_type.clone(),
            size: position.size,
            avg_price: position.avg_price,
            collateral: position.collateral,
            take_profit_trigger_price: position.take_profit_trigger_price,
            tx_hash: tx_hash.into(),
            kind,
            executed_at,
        }
    }
}

/// Per-user custodied signing credentials.
///
/// Generated exactly once per user id and immutable thereafter. The private
/// key is a 32-byte ed25519 seed, hex encoded; the address derives
/// deterministically from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub user_id: String,
    pub address: String,
    pub private_key_hex: String,
}

/// Result of a completed execution.
///
/// `reconciled` is false when the settled transaction hash was recorded but
/// the post-settlement position state did not match the expected outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub record: TradeRecord,
    pub reconciled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position() -> Position {
        Position {
            uid: 1,
            pair_type: "0x5ae6789dd2fec1a9ec9cccfb3acaf12e93d432f0a3a42c92fe1a9d490b7bbc06::pair_types::BTC_USD".to_string(),
            size: 300_000_000,
            collateral: 10_000_000,
            avg_price: 97_000_000_000,
            is_long: true,
            take_profit_trigger_price: 116_400_000_000,
        }
    }

    #[test]
    fn pair_matches_fully_qualified_type_tag() {
        let pos = sample_position();
        assert!(Pair::BtcUsd.matches_type_tag(&pos.pair_type));
    }

    #[test]
    fn pair_matches_bare_symbol() {
        assert!(Pair::BtcUsd.matches_type_tag("BTC_USD"));
    }

    #[test]
    fn pair_rejects_suffix_only_overlap() {
        // a plain ends_with check would accept this
        assert!(!Pair::BtcUsd.matches_type_tag("::pair_types::WBTC_USD"));
        assert!(!Pair::BtcUsd.matches_type_tag("XBTC_USD"));
    }

    #[test]
    fn pair_rejects_other_pair() {
        assert!(!Pair::BtcUsd.matches_type_tag("::pair_types::ETH_USD"));
    }

    #[test]
    fn trade_kind_round_trips_strings() {
        assert_eq!(TradeKind::parse("open"), Some(TradeKind::Open));
        assert_eq!(TradeKind::parse("close"), Some(TradeKind::Close));
        assert_eq!(TradeKind::parse("hold"), None);
        assert_eq!(TradeKind::Open.as_str(), "open");
    }

    #[test]
    fn close_intent_mirrors_position() {
        let pos = sample_position();
        let intent = OrderIntent::close_from(Pair::BtcUsd, &pos);
        assert_eq!(intent.size_delta, pos.size);
        assert_eq!(intent.collateral_delta, pos.collateral);
        assert_eq!(intent.is_long, pos.is_long);
        assert!(!intent.is_increase);
        assert_eq!(intent.kind, TradeKind::Close);
    }

    #[test]
    fn open_intent_is_long_increase() {
        let intent = OrderIntent::open(Pair::BtcUsd, 300_000_000, 10_000_000);
        assert!(intent.is_long);
        assert!(intent.is_increase);
        assert_eq!(intent.kind, TradeKind::Open);
    }

    #[test]
    fn trade_record_copies_position_fields() {
        let pos = sample_position();
        let record = TradeRecord::from_position(&pos, "0xdeadbeef", TradeKind::Open, Utc::now());
        assert_eq!(record.uid, pos.uid);
        assert_eq!(record.size, pos.size);
        assert_eq!(record.tx_hash, "0xdeadbeef");
        assert_eq!(record.kind, TradeKind::Open);
    }

    #[test]
    fn trade_kind_serializes_lowercase() {
        let json = serde_json::to_string(&TradeKind::Open).unwrap();
        assert_eq!(json, "\"open\"");
    }
}
