use crate::types::Pair;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub settlement: SettlementConfig,
    pub trading: TradingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather. Supplied via `PERP_BOT_TELEGRAM__BOT_TOKEN`
    /// rather than the config file.
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    pub api_url: String,
    pub network: String,
    pub finality_timeout_secs: u64,
    pub finality_poll_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub pair: Pair,
    /// Position size delta for a fixed open order, settlement-native units.
    pub open_size_delta: u64,
    /// Collateral delta for a fixed open order, micro-USDC.
    pub open_collateral_delta: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                path: "perp-bot.db".to_string(),
            },
            telegram: TelegramConfig {
                bot_token: String::new(),
            },
            settlement: SettlementConfig {
                api_url: "https://fullnode.testnet.aptoslabs.com/v1".to_string(),
                network: "testnet".to_string(),
                finality_timeout_secs: 30,
                finality_poll_ms: 500,
            },
            trading: TradingConfig {
                pair: Pair::BtcUsd,
                open_size_delta: 300_000_000,
                open_collateral_delta: 10_000_000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_trades_btc_usd() {
        let config = AppConfig::default();
        assert_eq!(config.trading.pair, Pair::BtcUsd);
        assert_eq!(config.trading.open_size_delta, 300_000_000);
        assert_eq!(config.trading.open_collateral_delta, 10_000_000);
    }

    #[test]
    fn default_finality_window_is_bounded() {
        let config = AppConfig::default();
        assert!(config.settlement.finality_timeout_secs > 0);
        assert!(config.settlement.finality_poll_ms > 0);
    }
}
