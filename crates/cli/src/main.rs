use anyhow::Context;
use clap::{Parser, Subcommand};
use perp_bot_core::{AppConfig, ConfigLoader, TradeNotifier};
use perp_bot_executor::TradeExecutor;
use perp_bot_settlement::RestSettlementClient;
use perp_bot_store::{Database, TradeLedger, WalletStore};
use perp_bot_telegram::{TelegramGateway, TelegramNotifier};
use perp_bot_web_api::ApiServer;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "perp-bot")]
#[command(about = "Custodial Telegram trading bot for BTC_USD perps", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram gateway and web API together
    Run,
    /// Run the web API only
    Server,
    /// Print every recorded trade in insertion order
    Trades,
    /// Read-only reconciliation pass: list a user's open positions
    Reconcile {
        /// User id to reconcile
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::load_from(&cli.config).context("failed to load configuration")?;

    match cli.command {
        Commands::Run => run(&config, true).await,
        Commands::Server => run(&config, false).await,
        Commands::Trades => print_trades(&config).await,
        Commands::Reconcile { user } => reconcile(&config, &user).await,
    }
}

async fn build_executor(config: &AppConfig) -> anyhow::Result<Arc<TradeExecutor>> {
    let db = Database::connect(&config.database.path)
        .await
        .context("failed to open database")?;

    let settlement = Arc::new(RestSettlementClient::new(
        config.settlement.api_url.clone(),
        Duration::from_millis(config.settlement.finality_poll_ms),
    ));

    Ok(Arc::new(TradeExecutor::new(
        WalletStore::new(&db),
        TradeLedger::new(&db),
        settlement,
        config.trading.clone(),
        Duration::from_secs(config.settlement.finality_timeout_secs),
    )))
}

async fn run(config: &AppConfig, with_telegram: bool) -> anyhow::Result<()> {
    let executor = build_executor(config).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    if with_telegram {
        anyhow::ensure!(
            !config.telegram.bot_token.is_empty(),
            "telegram bot token is required; set PERP_BOT_TELEGRAM__BOT_TOKEN"
        );
        let gateway = TelegramGateway::new(
            &config.telegram.bot_token,
            Arc::clone(&executor),
            config.settlement.network.clone(),
        );
        let notifier: Arc<dyn TradeNotifier> = Arc::new(TelegramNotifier::new(
            gateway.bot(),
            config.settlement.network.clone(),
        ));
        let server = ApiServer::new(executor, Some(notifier));

        tokio::select! {
            result = server.serve(&addr) => result,
            () = gateway.run() => Ok(()),
        }
    } else {
        ApiServer::new(executor, None).serve(&addr).await
    }
}

async fn print_trades(config: &AppConfig) -> anyhow::Result<()> {
    let executor = build_executor(config).await?;
    let trades = executor.trades().await?;
    if trades.is_empty() {
        println!("No trades recorded.");
        return Ok(());
    }
    for trade in trades {
        println!(
            "{} {} {} size={} collateral={} avg_price={} {}",
            trade.executed_at.to_rfc3339(),
            trade.kind,
            trade.pair_type,
            trade.size,
            trade.collateral,
            trade.avg_price,
            trade.tx_hash,
        );
    }
    Ok(())
}

async fn reconcile(config: &AppConfig, user: &str) -> anyhow::Result<()> {
    let executor = build_executor(config).await?;
    let positions = executor.reconcile_positions(user).await?;
    if positions.is_empty() {
        println!("No open positions for {user}.");
        return Ok(());
    }
    for p in positions {
        println!(
            "{} uid={} size={} collateral={} avg_price={} {}",
            p.pair_type,
            p.uid,
            p.size,
            p.collateral,
            p.avg_price,
            if p.is_long { "long" } else { "short" },
        );
    }
    Ok(())
}
