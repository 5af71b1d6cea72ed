//! Message formatting for the chat gateway.

use perp_bot_core::{Position, TradeRecord, WalletRecord};

const EXPLORER_BASE: &str = "https://explorer.aptoslabs.com/txn";

/// Explorer link for a settled transaction.
#[must_use]
pub fn explorer_link(tx_hash: &str, network: &str) -> String {
    format!("{EXPLORER_BASE}/{tx_hash}?network={network}")
}

/// Formats a micro-USDC amount as a decimal USDC string.
#[must_use]
pub fn format_usdc(micro: u64) -> String {
    format!("{}.{:06} USDC", micro / 1_000_000, micro % 1_000_000)
}

/// Welcome message for an already registered user.
#[must_use]
pub fn welcome_back(username: &str, wallet: &WalletRecord) -> String {
    format!(
        "Welcome back, @{username}!\n\n\
         Your address: `{}`\n\
         Use /openposition to trade, or /balance to check your balance.",
        wallet.address
    )
}

/// Registration message. The private key appears here exactly once and is
/// never shown again.
#[must_use]
pub fn registration_complete(wallet: &WalletRecord) -> String {
    format!(
        "✅ Registration complete!\n\
         Your new address: `{}`\n\n\
         Your 32-byte private key (hex), displayed only once:\n`{}`\n\n\
         Keep it safe! Use /balance to check your balance.",
        wallet.address, wallet.private_key_hex
    )
}

/// Balance reply with the custodial address.
#[must_use]
pub fn balance_message(address: &str, micro_usdc: u64) -> String {
    format!(
        "🔹 *Your address:* `{address}`\n\n\
         💰 *Collateral balance:* {}",
        format_usdc(micro_usdc)
    )
}

/// Trade summary pushed after a recorded execution.
#[must_use]
pub fn trade_message(record: &TradeRecord, reconciled: bool, network: &str) -> String {
    let headline = match (record.kind, reconciled) {
        (perp_bot_core::TradeKind::Open, true) => "🚀 *Trade Executed!*",
        (perp_bot_core::TradeKind::Close, true) => "🚀 *Position Closed!*",
        (_, false) => "⚠️ *Trade Settled (unverified)*",
    };
    format!(
        "{headline}\n\n\
         📌 *Details:*\n\
         🔹 *UID:* {}\n\
         🔹 *Pair:* {}\n\
         🔹 *Size:* {}\n\
         🔹 *Avg Price:* {}\n\
         🔹 *Collateral:* {}\n\
         🔹 *Take Profit:* {}\n\
         🔹 *Type:* {}\n\n\
         ✅ *Txn Hash:* `{}`\n\n\
         🔗 [View Transaction]({})",
        record.uid,
        record.pair_type,
        record.size,
        record.avg_price,
        record.collateral,
        record.take_profit_trigger_price,
        record.kind,
        record.tx_hash,
        explorer_link(&record.tx_hash, network)
    )
}

/// Reply for a read-only reconciliation pass.
#[must_use]
pub fn positions_message(positions: &[Position]) -> String {
    if positions.is_empty() {
        return "No open positions.".to_string();
    }
    let mut out = String::from("📊 *Open positions:*\n");
    for p in positions {
        out.push_str(&format!(
            "\n🔹 {}: size {}, collateral {}, avg price {}, {}",
            p.pair_type,
            p.size,
            p.collateral,
            p.avg_price,
            if p.is_long { "long" } else { "short" }
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use perp_bot_core::TradeKind;

    fn record() -> TradeRecord {
        TradeRecord {
            uid: 1,
            pair_type: "0x5ae::pair_types::BTC_USD".to_string(),
            size: 300_000_000,
            avg_price: 97_000_000_000,
            collateral: 10_000_000,
            take_profit_trigger_price: 0,
            tx_hash: "0xdeadbeef".to_string(),
            kind: TradeKind::Open,
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn usdc_formatting_keeps_six_decimals() {
        assert_eq!(format_usdc(10_000_000), "10.000000 USDC");
        assert_eq!(format_usdc(1_234_567), "1.234567 USDC");
        assert_eq!(format_usdc(42), "0.000042 USDC");
    }

    #[test]
    fn trade_message_links_the_transaction() {
        let msg = trade_message(&record(), true, "testnet");
        assert!(msg.contains("0xdeadbeef"));
        assert!(msg.contains("explorer.aptoslabs.com/txn/0xdeadbeef?network=testnet"));
        assert!(msg.contains("open"));
    }

    #[test]
    fn unreconciled_trade_is_flagged() {
        let msg = trade_message(&record(), false, "testnet");
        assert!(msg.contains("unverified"));
    }

    #[test]
    fn registration_shows_key_exactly_once() {
        let wallet = WalletRecord {
            user_id: "u1".to_string(),
            address: "0xabc".to_string(),
            private_key_hex: "11".repeat(32),
        };
        let msg = registration_complete(&wallet);
        assert_eq!(msg.matches(&wallet.private_key_hex).count(), 1);
        assert!(!welcome_back("user", &wallet).contains(&wallet.private_key_hex));
    }

    #[test]
    fn empty_positions_have_a_distinct_reply() {
        assert_eq!(positions_message(&[]), "No open positions.");
    }
}
