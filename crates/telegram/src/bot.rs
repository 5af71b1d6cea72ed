//! Command handling for the Telegram gateway.

use crate::format;
use perp_bot_core::TradeKind;
use perp_bot_executor::TradeExecutor;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
pub enum Command {
    #[command(description = "register and show your custodial address")]
    Start,
    #[command(description = "show your address and collateral balance")]
    Balance,
    #[command(description = "open the configured BTC_USD long")]
    OpenPosition,
    #[command(description = "close your BTC_USD position")]
    ClosePosition,
    #[command(description = "list open positions (after an ambiguous outcome)")]
    Reconcile,
    #[command(description = "show this help text")]
    Help,
}

pub struct TelegramGateway {
    bot: Bot,
    executor: Arc<TradeExecutor>,
    network: String,
}

impl TelegramGateway {
    #[must_use]
    pub fn new(bot_token: &str, executor: Arc<TradeExecutor>, network: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(bot_token),
            executor,
            network: network.into(),
        }
    }

    /// The underlying bot, shared with the notifier half.
    #[must_use]
    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    /// Runs the command loop until the process shuts down.
    pub async fn run(self) {
        tracing::info!("telegram gateway started");
        let executor = self.executor;
        let network = self.network;

        Command::repl(self.bot, move |bot: Bot, msg: Message, cmd: Command| {
            let executor = Arc::clone(&executor);
            let network = network.clone();
            async move {
                let reply = handle_command(&executor, &msg, cmd, &network).await;
                bot.send_message(msg.chat.id, reply)
                    .parse_mode(ParseMode::Markdown)
                    .await?;
                Ok(())
            }
        })
        .await;
    }
}

async fn handle_command(
    executor: &TradeExecutor,
    msg: &Message,
    cmd: Command,
    network: &str,
) -> String {
    let Some(user) = msg.from() else {
        return "Could not identify you.".to_string();
    };
    let user_id = user.id.0.to_string();
    let username = user.username.clone().unwrap_or_default();

    match cmd {
        Command::Start => match executor.register(&user_id).await {
            Ok((wallet, true)) => {
                tracing::info!(user_id, address = %wallet.address, "user registered");
                format::registration_complete(&wallet)
            }
            Ok((wallet, false)) => format::welcome_back(&username, &wallet),
            Err(err) => err.user_message(),
        },
        Command::Balance => match executor.balance(&user_id).await {
            Ok((address, micro_usdc)) => format::balance_message(&address, micro_usdc),
            Err(err) => err.user_message(),
        },
        Command::OpenPosition => run_trade(executor, &user_id, TradeKind::Open, network).await,
        Command::ClosePosition => run_trade(executor, &user_id, TradeKind::Close, network).await,
        Command::Reconcile => match executor.reconcile_positions(&user_id).await {
            Ok(positions) => format::positions_message(&positions),
            Err(err) => err.user_message(),
        },
        Command::Help => Command::descriptions().to_string(),
    }
}

async fn run_trade(
    executor: &TradeExecutor,
    user_id: &str,
    kind: TradeKind,
    network: &str,
) -> String {
    match executor.execute(user_id, kind).await {
        Ok(outcome) => format::trade_message(&outcome.record, outcome.reconciled, network),
        Err(err) => {
            tracing::warn!(user_id, %err, "trade command failed");
            err.user_message()
        }
    }
}
