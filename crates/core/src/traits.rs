use crate::error::Result;
use crate::types::{EntryFunctionPayload, OrderIntent, Position, TradeRecord, TxHandle, WalletRecord};
use async_trait::async_trait;
use std::time::Duration;

/// Seam to the remote settlement layer.
///
/// The trade executor depends only on this trait; the REST implementation and
/// the test double are substituted here without touching the engine.
#[async_trait]
pub trait SettlementClient: Send + Sync {
    /// Builds the entry-function payload for a market order intent.
    fn build_order_payload(&self, intent: &OrderIntent, sender: &str) -> EntryFunctionPayload;

    /// Signs the payload with the wallet's key material and submits it.
    ///
    /// # Errors
    /// Returns `SubmissionRejected` if the settlement layer rejects the
    /// transaction. Non-retryable.
    async fn submit(&self, payload: &EntryFunctionPayload, wallet: &WalletRecord)
        -> Result<TxHandle>;

    /// Polls until the transaction is finalized or the timeout elapses.
    ///
    /// "Submitted" and "settled" are distinct states; position reads between
    /// them are not authoritative.
    ///
    /// # Errors
    /// Returns `FinalityTimeout` when the deadline passes with the outcome
    /// still unknown, or `TransactionFailed` when on-chain execution reverted.
    async fn await_finality(&self, handle: &TxHandle, timeout: Duration) -> Result<()>;

    /// Read-only snapshot of the account's open positions.
    ///
    /// # Errors
    /// Returns an error if the settlement layer cannot be queried.
    async fn get_positions(&self, address: &str) -> Result<Vec<Position>>;

    /// The account's collateral (USDC) balance in micro units.
    ///
    /// # Errors
    /// Returns an error if the settlement layer cannot be queried.
    async fn usdc_balance(&self, address: &str) -> Result<u64>;
}

/// Outbound notification seam for completed trades.
///
/// Lets the HTTP gateway push chat notifications without depending on the
/// chat transport.
#[async_trait]
pub trait TradeNotifier: Send + Sync {
    /// Pushes a recorded trade to the user's chat. `reconciled` carries the
    /// outcome's verification state so an unverified trade is flagged there
    /// as well.
    async fn notify_trade(&self, user_id: &str, record: &TradeRecord, reconciled: bool);
}
