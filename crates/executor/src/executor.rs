//! The trade executor state machine.
//!
//! `Idle -> CredentialsLoaded -> PayloadBuilt -> Submitted -> Settled ->
//! Reconciled -> Recorded`, with failure terminal from any state. Lookup
//! failures reject before any remote write; submission failures are never
//! retried automatically; a finality timeout is surfaced as an ambiguous
//! outcome rather than success or failure.

use crate::in_flight::InFlightGuard;
use chrono::Utc;
use perp_bot_core::{
    EngineError, ExecutionOutcome, OrderIntent, Position, Result, SettlementClient, TradeKind,
    TradeRecord, TradingConfig, WalletRecord,
};
use perp_bot_settlement::SettlementAccount;
use perp_bot_store::{TradeLedger, WalletStore};
use std::sync::Arc;
use std::time::Duration;

pub struct TradeExecutor {
    wallets: WalletStore,
    ledger: TradeLedger,
    settlement: Arc<dyn SettlementClient>,
    trading: TradingConfig,
    finality_timeout: Duration,
    in_flight: InFlightGuard,
}

impl TradeExecutor {
    #[must_use]
    pub fn new(
        wallets: WalletStore,
        ledger: TradeLedger,
        settlement: Arc<dyn SettlementClient>,
        trading: TradingConfig,
        finality_timeout: Duration,
    ) -> Self {
        Self {
            wallets,
            ledger,
            settlement,
            trading,
            finality_timeout,
            in_flight: InFlightGuard::new(),
        }
    }

    /// Runs one open/close execution end to end.
    ///
    /// # Errors
    /// Every failure kind in the engine taxonomy can surface here; see
    /// `EngineError`. A second call for the same user while one execution is
    /// in flight fails with `ExecutionInProgress` and has no side effects.
    pub async fn execute(&self, user_id: &str, kind: TradeKind) -> Result<ExecutionOutcome> {
        let _slot = self.in_flight.acquire(user_id)?;
        tracing::info!(user_id, kind = %kind, "execution started");

        let result = self.run(user_id, kind).await;
        match &result {
            Ok(outcome) => tracing::info!(
                user_id,
                tx_hash = %outcome.record.tx_hash,
                reconciled = outcome.reconciled,
                "execution recorded"
            ),
            Err(err) => tracing::warn!(user_id, %err, "execution failed"),
        }
        result
    }

    async fn run(&self, user_id: &str, kind: TradeKind) -> Result<ExecutionOutcome> {
        // Idle -> CredentialsLoaded
        let wallet = self
            .wallets
            .get(user_id)
            .await?
            .ok_or_else(|| EngineError::UserNotRegistered {
                user_id: user_id.to_string(),
            })?;

        // CredentialsLoaded -> PayloadBuilt
        let (intent, pre_close_position) = self.build_intent(&wallet, kind).await?;
        let payload = self
            .settlement
            .build_order_payload(&intent, &wallet.address);

        // PayloadBuilt -> Submitted. Rejection is fatal: remote state is
        // unknown, so the same intent is never resubmitted.
        let handle = self.settlement.submit(&payload, &wallet).await?;

        // Submitted -> Settled
        self.settlement
            .await_finality(&handle, self.finality_timeout)
            .await?;

        // Settled -> Reconciled
        let (snapshot, reconciled) = self
            .reconcile(&wallet, kind, &intent, pre_close_position, &handle.hash)
            .await?;

        // Reconciled -> Recorded
        let record = TradeRecord::from_position(&snapshot, &handle.hash, kind, Utc::now());
        self.ledger
            .append(&record)
            .await
            .map_err(|e| EngineError::storage_after_settlement(&handle.hash, e))?;

        Ok(ExecutionOutcome { record, reconciled })
    }

    async fn build_intent(
        &self,
        wallet: &WalletRecord,
        kind: TradeKind,
    ) -> Result<(OrderIntent, Option<Position>)> {
        match kind {
            TradeKind::Open => Ok((
                OrderIntent::open(
                    self.trading.pair,
                    self.trading.open_size_delta,
                    self.trading.open_collateral_delta,
                ),
                None,
            )),
            TradeKind::Close => {
                let positions = self.settlement.get_positions(&wallet.address).await?;
                let position = positions
                    .into_iter()
                    .find(|p| self.trading.pair.matches_type_tag(&p.pair_type) && !p.is_flat())
                    .ok_or(EngineError::PositionNotFound {
                        pair: self.trading.pair,
                    })?;
                Ok((
                    OrderIntent::close_from(self.trading.pair, &position),
                    Some(position),
                ))
            }
        }
    }

    /// Re-reads remote state after settlement and checks the expected effect.
    ///
    /// A mismatch never voids the settled transaction: chain state is ground
    /// truth, so the hash is still recorded, flagged as unreconciled.
    async fn reconcile(
        &self,
        wallet: &WalletRecord,
        kind: TradeKind,
        intent: &OrderIntent,
        pre_close_position: Option<Position>,
        tx_hash: &str,
    ) -> Result<(Position, bool)> {
        let current = match self.settlement.get_positions(&wallet.address).await {
            Ok(positions) => positions
                .into_iter()
                .find(|p| self.trading.pair.matches_type_tag(&p.pair_type)),
            Err(err) => {
                // The transaction already settled; a failed read must not
                // void the record
                tracing::warn!(
                    user_id = %wallet.user_id,
                    tx_hash,
                    %err,
                    "position read failed after settlement"
                );
                let snapshot = match kind {
                    TradeKind::Open => self.placeholder_position(intent),
                    TradeKind::Close => pre_close_position.ok_or_else(|| {
                        EngineError::internal("close without pre-close snapshot")
                    })?,
                };
                return Ok((snapshot, false));
            }
        };

        match kind {
            TradeKind::Open => match current {
                Some(position) if !position.is_flat() => Ok((position, true)),
                _ => {
                    tracing::warn!(
                        user_id = %wallet.user_id,
                        tx_hash,
                        "expected open position missing after settlement"
                    );
                    Ok((self.placeholder_position(intent), false))
                }
            },
            TradeKind::Close => {
                let closed = current.as_ref().map_or(true, |p| p.is_flat());
                if !closed {
                    tracing::warn!(
                        user_id = %wallet.user_id,
                        tx_hash,
                        "position still open after close settled"
                    );
                }
                // The record reflects the position that was closed
                let snapshot = pre_close_position
                    .ok_or_else(|| EngineError::internal("close without pre-close snapshot"))?;
                Ok((snapshot, closed))
            }
        }
    }

    /// Record basis when an open settled but no position is observable.
    fn placeholder_position(&self, intent: &OrderIntent) -> Position {
        Position {
            uid: 0,
            pair_type: self.trading.pair.as_str().to_string(),
            size: intent.size_delta,
            collateral: intent.collateral_delta,
            avg_price: 0,
            is_long: intent.is_long,
            take_profit_trigger_price: 0,
        }
    }

    /// Registers a user, generating credentials on first call only. The
    /// boolean is true when this call created the wallet.
    ///
    /// # Errors
    /// Returns `Storage` if the wallet store cannot be read or written.
    pub async fn register(&self, user_id: &str) -> Result<(WalletRecord, bool)> {
        let owner = user_id.to_string();
        self.wallets
            .get_or_create(user_id, move || {
                SettlementAccount::generate().into_wallet_record(owner)
            })
            .await
    }

    /// The user's custodial address, if registered.
    ///
    /// # Errors
    /// Returns `Storage` if the wallet store cannot be read.
    pub async fn wallet_address(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.wallets.get(user_id).await?.map(|w| w.address))
    }

    /// Address and USDC collateral balance for a registered user.
    ///
    /// # Errors
    /// Returns `UserNotRegistered` if no wallet exists, or a settlement
    /// query error.
    pub async fn balance(&self, user_id: &str) -> Result<(String, u64)> {
        let wallet = self
            .wallets
            .get(user_id)
            .await?
            .ok_or_else(|| EngineError::UserNotRegistered {
                user_id: user_id.to_string(),
            })?;
        let balance = self.settlement.usdc_balance(&wallet.address).await?;
        Ok((wallet.address, balance))
    }

    /// Read-only reconciliation pass: lists current positions without
    /// submitting anything. The follow-up to an ambiguous outcome.
    ///
    /// # Errors
    /// Returns `UserNotRegistered` if no wallet exists, or a settlement
    /// query error.
    pub async fn reconcile_positions(&self, user_id: &str) -> Result<Vec<Position>> {
        let wallet = self
            .wallets
            .get(user_id)
            .await?
            .ok_or_else(|| EngineError::UserNotRegistered {
                user_id: user_id.to_string(),
            })?;
        self.settlement.get_positions(&wallet.address).await
    }

    /// All recorded trades, insertion order.
    ///
    /// # Errors
    /// Returns `Storage` if the ledger cannot be read.
    pub async fn trades(&self) -> Result<Vec<TradeRecord>> {
        self.ledger.list_all().await
    }
}
