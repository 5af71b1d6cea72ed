pub mod config;
pub mod config_loader;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{
    AppConfig, DatabaseConfig, ServerConfig, SettlementConfig, TelegramConfig, TradingConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{EngineError, Result};
pub use traits::{SettlementClient, TradeNotifier};
pub use types::{
    EntryFunctionPayload, ExecutionOutcome, OrderIntent, Pair, Position, TradeKind, TradeRecord,
    TxHandle, WalletRecord,
};
