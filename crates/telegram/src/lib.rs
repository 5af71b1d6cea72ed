//! Telegram gateway for the perp trading bot.
//!
//! Commands: /start (register, one-time key display), /balance,
//! /openposition, /closeposition, /reconcile. Every engine error kind maps
//! to its own reply text. The notifier half pushes trade summaries for
//! executions that originated over HTTP.

pub mod bot;
pub mod format;
pub mod notifier;

pub use bot::TelegramGateway;
pub use notifier::TelegramNotifier;
