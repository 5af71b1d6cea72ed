//! HTTP gateway for the perp trading bot.
//!
//! Thin transport over the trade executor: intents come in with the user id
//! in the `x-user-id` header, every engine error kind maps to a distinct
//! status code and JSON body, and successful trades are pushed to the chat
//! notifier as a side channel.

pub mod handlers;
pub mod server;

pub use server::{ApiServer, AppState};
