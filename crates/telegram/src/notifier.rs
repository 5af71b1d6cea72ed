//! Push notifications for trades that originated over HTTP.

use crate::format;
use async_trait::async_trait;
use perp_bot_core::{TradeNotifier, TradeRecord};
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};

pub struct TelegramNotifier {
    bot: Bot,
    network: String,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(bot: Bot, network: impl Into<String>) -> Self {
        Self {
            bot,
            network: network.into(),
        }
    }
}

#[async_trait]
impl TradeNotifier for TelegramNotifier {
    async fn notify_trade(&self, user_id: &str, record: &TradeRecord, reconciled: bool) {
        // Telegram user ids are numeric; the chat with the user shares the id
        let Ok(chat_id) = user_id.parse::<i64>() else {
            tracing::warn!(user_id, "cannot notify non-numeric user id");
            return;
        };

        let message = format::trade_message(record, reconciled, &self.network);
        if let Err(err) = self
            .bot
            .send_message(ChatId(chat_id), message)
            .parse_mode(ParseMode::Markdown)
            .await
        {
            tracing::warn!(user_id, %err, "trade notification failed");
        }
    }
}
