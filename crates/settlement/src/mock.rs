//! Scriptable settlement client for engine tests.
//!
//! Makes zero network calls. Position snapshots are served in sequence (the
//! last one repeats), submissions are recorded for assertions, and the
//! submit/finality path can be forced down any failure branch.

use async_trait::async_trait;
use parking_lot::Mutex;
use perp_bot_core::{
    EngineError, EntryFunctionPayload, OrderIntent, Position, Result, SettlementClient, TxHandle,
    WalletRecord,
};
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;

/// How the mock behaves on the submit/finality path.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Submission accepted and finalized.
    Settle,
    /// Submission rejected by the remote layer.
    Reject(String),
    /// Submission accepted but on-chain execution reverted.
    Revert(String),
    /// Submission accepted, finality never observed.
    Timeout,
}

pub struct MockSettlementClient {
    behavior: Mutex<MockBehavior>,
    snapshots: Mutex<VecDeque<SnapshotResult>>,
    submissions: Mutex<Vec<EntryFunctionPayload>>,
    next_hash: Mutex<String>,
    balance: Mutex<u64>,
}

type SnapshotResult = std::result::Result<Vec<Position>, String>;

impl Default for MockSettlementClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSettlementClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            behavior: Mutex::new(MockBehavior::Settle),
            snapshots: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            next_hash: Mutex::new("0xdeadbeef".to_string()),
            balance: Mutex::new(0),
        }
    }

    /// Queues position snapshots returned by successive `get_positions`
    /// calls. The final snapshot repeats once the queue drains.
    pub fn push_snapshot(&self, positions: Vec<Position>) {
        self.snapshots.lock().push_back(Ok(positions));
    }

    /// Queues a `get_positions` failure at this point in the sequence.
    pub fn push_snapshot_failure(&self, reason: impl Into<String>) {
        self.snapshots.lock().push_back(Err(reason.into()));
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn set_next_hash(&self, hash: impl Into<String>) {
        *self.next_hash.lock() = hash.into();
    }

    pub fn set_balance(&self, balance: u64) {
        *self.balance.lock() = balance;
    }

    /// Number of transactions submitted through this mock.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }

    /// Copies of every submitted payload, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<EntryFunctionPayload> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl SettlementClient for MockSettlementClient {
    fn build_order_payload(&self, intent: &OrderIntent, sender: &str) -> EntryFunctionPayload {
        EntryFunctionPayload {
            function: "0xmock::managed_trading::place_order_v3".to_string(),
            type_arguments: vec![format!("0xmock::pair_types::{}", intent.pair)],
            arguments: vec![
                json!(sender),
                json!(intent.size_delta.to_string()),
                json!(intent.collateral_delta.to_string()),
                json!(intent.is_long),
                json!(intent.is_increase),
            ],
        }
    }

    async fn submit(
        &self,
        payload: &EntryFunctionPayload,
        _wallet: &WalletRecord,
    ) -> Result<TxHandle> {
        if let MockBehavior::Reject(reason) = &*self.behavior.lock() {
            return Err(EngineError::SubmissionRejected(reason.clone()));
        }
        self.submissions.lock().push(payload.clone());
        Ok(TxHandle::new(self.next_hash.lock().clone()))
    }

    async fn await_finality(&self, handle: &TxHandle, _timeout: Duration) -> Result<()> {
        match &*self.behavior.lock() {
            MockBehavior::Settle | MockBehavior::Reject(_) => Ok(()),
            MockBehavior::Revert(vm_status) => Err(EngineError::TransactionFailed {
                tx_hash: handle.hash.clone(),
                vm_status: vm_status.clone(),
            }),
            MockBehavior::Timeout => Err(EngineError::FinalityTimeout {
                tx_hash: handle.hash.clone(),
            }),
        }
    }

    async fn get_positions(&self, _address: &str) -> Result<Vec<Position>> {
        let mut snapshots = self.snapshots.lock();
        let entry = if snapshots.len() > 1 {
            snapshots.pop_front()
        } else {
            snapshots.front().cloned()
        };
        match entry {
            Some(Ok(positions)) => Ok(positions),
            Some(Err(reason)) => Err(EngineError::internal(reason)),
            None => Ok(Vec::new()),
        }
    }

    async fn usdc_balance(&self, _address: &str) -> Result<u64> {
        Ok(*self.balance.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perp_bot_core::Pair;

    fn btc_position() -> Position {
        Position {
            uid: 1,
            pair_type: "0xmock::pair_types::BTC_USD".to_string(),
            size: 300_000_000,
            collateral: 10_000_000,
            avg_price: 97_000_000_000,
            is_long: true,
            take_profit_trigger_price: 0,
        }
    }

    #[tokio::test]
    async fn snapshots_serve_in_sequence_and_last_repeats() {
        let mock = MockSettlementClient::new();
        mock.push_snapshot(vec![]);
        mock.push_snapshot(vec![btc_position()]);

        assert!(mock.get_positions("0x1").await.unwrap().is_empty());
        assert_eq!(mock.get_positions("0x1").await.unwrap().len(), 1);
        // queue drained; last snapshot repeats
        assert_eq!(mock.get_positions("0x1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn queued_position_failure_is_served_in_sequence() {
        let mock = MockSettlementClient::new();
        mock.push_snapshot(vec![btc_position()]);
        mock.push_snapshot_failure("node unavailable");

        assert_eq!(mock.get_positions("0x1").await.unwrap().len(), 1);
        assert!(mock.get_positions("0x1").await.is_err());
        // the failure is terminal in the sequence and repeats
        assert!(mock.get_positions("0x1").await.is_err());
    }

    #[tokio::test]
    async fn rejection_records_no_submission() {
        let mock = MockSettlementClient::new();
        mock.set_behavior(MockBehavior::Reject("bad signature".to_string()));
        let intent = OrderIntent::open(Pair::BtcUsd, 1, 1);
        let payload = mock.build_order_payload(&intent, "0x1");
        let wallet = WalletRecord {
            user_id: "u1".to_string(),
            address: "0x1".to_string(),
            private_key_hex: "00".repeat(32),
        };
        let err = mock.submit(&payload, &wallet).await.unwrap_err();
        assert!(matches!(err, EngineError::SubmissionRejected(_)));
        assert_eq!(mock.submission_count(), 0);
    }
}
