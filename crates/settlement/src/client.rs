//! REST client for the settlement layer.
//!
//! Submission and finality are distinct states: `submit` returns as soon as
//! the transaction is accepted into the mempool, and `await_finality` polls
//! on a bounded schedule until the transaction is confirmed, reverted, or the
//! deadline passes.

use crate::account::SettlementAccount;
use async_trait::async_trait;
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use perp_bot_core::{
    EngineError, EntryFunctionPayload, OrderIntent, Position, Result, SettlementClient, TxHandle,
    WalletRecord,
};
use serde::Deserialize;
use serde_json::json;
use sha3::{Digest, Sha3_256};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Deployed trading contract address.
const DEFAULT_CONTRACT_ADDRESS: &str =
    "0x5ae6789dd2fec1a9ec9cccfb3acaf12e93d432f0a3a42c92fe1a9d490b7bbc06";

type DirectRateLimiter = RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>;

pub struct RestSettlementClient {
    http_client: reqwest::Client,
    base_url: String,
    contract_address: String,
    rate_limiter: Arc<DirectRateLimiter>,
    poll_interval: Duration,
}

impl RestSettlementClient {
    #[must_use]
    pub fn new(base_url: String, poll_interval: Duration) -> Self {
        // Public fullnodes allow roughly 10 req/s per IP
        let quota = Quota::per_second(NonZeroU32::new(10).unwrap());

        Self {
            http_client: reqwest::Client::new(),
            base_url,
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            poll_interval,
        }
    }

    /// Overrides the trading contract address (testnet vs mainnet deployment).
    #[must_use]
    pub fn with_contract_address(mut self, address: impl Into<String>) -> Self {
        self.contract_address = address.into();
        self
    }

    fn type_tag(&self, segment: &str) -> String {
        format!("{}::{segment}", self.contract_address)
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(EngineError::internal)?;
        let status = response.status();
        let body = response.text().await.map_err(EngineError::internal)?;
        if !status.is_success() {
            return Err(EngineError::internal(format!(
                "GET {path} returned {status}: {body}"
            )));
        }
        serde_json::from_str(&body).map_err(EngineError::internal)
    }
}

#[async_trait]
impl SettlementClient for RestSettlementClient {
    fn build_order_payload(&self, intent: &OrderIntent, sender: &str) -> EntryFunctionPayload {
        EntryFunctionPayload {
            function: self.type_tag("managed_trading::place_order_v3"),
            type_arguments: vec![
                self.type_tag(&format!("pair_types::{}", intent.pair)),
                self.type_tag("fa_box::W_USDC"),
            ],
            arguments: vec![
                json!(sender),
                json!(intent.size_delta.to_string()),
                json!(intent.collateral_delta.to_string()),
                // Market order: no limit price, executable at any price
                json!("0"),
                json!(intent.is_long),
                json!(intent.is_increase),
                json!(true),
                json!("0"),
                json!("0"),
                json!(intent.is_long),
            ],
        }
    }

    async fn submit(
        &self,
        payload: &EntryFunctionPayload,
        wallet: &WalletRecord,
    ) -> Result<TxHandle> {
        let account = SettlementAccount::from_wallet(wallet)?;

        let payload_bytes =
            serde_json::to_vec(payload).map_err(EngineError::internal)?;
        let mut hasher = Sha3_256::new();
        hasher.update(account.address().as_bytes());
        hasher.update(&payload_bytes);
        let signature = account.sign(&hasher.finalize());

        let body = json!({
            "sender": account.address(),
            "payload": {
                "type": "entry_function_payload",
                "function": payload.function,
                "type_arguments": payload.type_arguments,
                "arguments": payload.arguments,
            },
            "signature": {
                "type": "ed25519_signature",
                "public_key": account.public_key_hex(),
                "signature": format!("0x{}", hex::encode(signature.to_bytes())),
            },
        });

        self.rate_limiter.until_ready().await;
        let url = format!("{}/transactions", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::SubmissionRejected(format!("transport: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EngineError::SubmissionRejected(format!("transport: {e}")))?;
        if !status.is_success() {
            return Err(EngineError::SubmissionRejected(format!("{status}: {text}")));
        }

        let accepted: PendingTransaction =
            serde_json::from_str(&text).map_err(EngineError::internal)?;
        tracing::info!(tx_hash = %accepted.hash, "transaction submitted");
        Ok(TxHandle::new(accepted.hash))
    }

    async fn await_finality(&self, handle: &TxHandle, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self
                .get_json(&format!("/transactions/by_hash/{}", handle.hash))
                .await
            {
                Ok(tx) => {
                    let tx_type = tx.get("type").and_then(|t| t.as_str()).unwrap_or_default();
                    if tx_type != "pending_transaction" {
                        if let Some(success) = tx.get("success").and_then(serde_json::Value::as_bool)
                        {
                            if success {
                                tracing::info!(tx_hash = %handle.hash, "transaction finalized");
                                return Ok(());
                            }
                            let vm_status = tx
                                .get("vm_status")
                                .and_then(|s| s.as_str())
                                .unwrap_or("unknown")
                                .to_string();
                            return Err(EngineError::TransactionFailed {
                                tx_hash: handle.hash.clone(),
                                vm_status,
                            });
                        }
                    }
                }
                Err(err) => {
                    // Not-yet-indexed hashes and transient node errors both
                    // look like failures here; keep polling until the deadline
                    tracing::debug!(tx_hash = %handle.hash, %err, "finality poll not conclusive");
                }
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                return Err(EngineError::FinalityTimeout {
                    tx_hash: handle.hash.clone(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn get_positions(&self, address: &str) -> Result<Vec<Position>> {
        let raw: Vec<WirePosition> = serde_json::from_value(
            self.get_json(&format!("/accounts/{address}/positions")).await?,
        )
        .map_err(EngineError::internal)?;

        raw.into_iter().map(WirePosition::into_position).collect()
    }

    async fn usdc_balance(&self, address: &str) -> Result<u64> {
        let value = self
            .get_json(&format!("/accounts/{address}/balance/usdc"))
            .await?;
        let balance = value
            .get("balance")
            .and_then(|b| b.as_str())
            .ok_or_else(|| EngineError::internal("missing balance field"))?;
        parse_u64(balance, "balance")
    }
}

#[derive(Debug, Deserialize)]
struct PendingTransaction {
    hash: String,
}

/// Position as returned by the node, with u64 fields string-encoded.
#[derive(Debug, Deserialize)]
struct WirePosition {
    uid: String,
    pair_type: String,
    size: String,
    collateral: String,
    avg_price: String,
    is_long: bool,
    take_profit_trigger_price: String,
}

impl WirePosition {
    fn into_position(self) -> Result<Position> {
        Ok(Position {
            uid: parse_u64(&self.uid, "uid")?,
            pair_type: self.pair_type,
            size: parse_u64(&self.size, "size")?,
            collateral: parse_u64(&self.collateral, "collateral")?,
            avg_price: parse_u64(&self.avg_price, "avg_price")?,
            is_long: self.is_long,
            take_profit_trigger_price: parse_u64(
                &self.take_profit_trigger_price,
                "take_profit_trigger_price",
            )?,
        })
    }
}

fn parse_u64(value: &str, field: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|e| EngineError::internal(format!("invalid {field} {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use perp_bot_core::{Pair, TradeKind};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_wallet() -> WalletRecord {
        SettlementAccount::from_private_key_hex(&"11".repeat(32))
            .unwrap()
            .into_wallet_record("u1")
    }

    fn test_client(base_url: String) -> RestSettlementClient {
        RestSettlementClient::new(base_url, Duration::from_millis(10))
    }

    fn open_intent() -> OrderIntent {
        OrderIntent::open(Pair::BtcUsd, 300_000_000, 10_000_000)
    }

    #[test]
    fn order_payload_targets_exact_pair_type() {
        let client = test_client("http://unused".to_string());
        let payload = client.build_order_payload(&open_intent(), "0xabc");
        assert!(payload.function.ends_with("managed_trading::place_order_v3"));
        assert!(payload.type_arguments[0].ends_with("pair_types::BTC_USD"));
        assert_eq!(payload.arguments[1], json!("300000000"));
        assert_eq!(payload.arguments[2], json!("10000000"));
    }

    #[test]
    fn close_payload_flags_decrease() {
        let client = test_client("http://unused".to_string());
        let position = Position {
            uid: 1,
            pair_type: "pair_types::BTC_USD".to_string(),
            size: 300_000_000,
            collateral: 10_000_000,
            avg_price: 97_000_000_000,
            is_long: true,
            take_profit_trigger_price: 0,
        };
        let intent = OrderIntent::close_from(Pair::BtcUsd, &position);
        assert_eq!(intent.kind, TradeKind::Close);
        let payload = client.build_order_payload(&intent, "0xabc");
        // is_increase argument
        assert_eq!(payload.arguments[5], json!(false));
    }

    #[tokio::test]
    async fn submit_returns_hash_on_accept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transactions"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "hash": "0xdeadbeef"
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let payload = client.build_order_payload(&open_intent(), "0xabc");
        let handle = client.submit(&payload, &test_wallet()).await.unwrap();
        assert_eq!(handle.hash, "0xdeadbeef");
    }

    #[tokio::test]
    async fn submit_rejection_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transactions"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"message": "INSUFFICIENT_BALANCE"})),
            )
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let payload = client.build_order_payload(&open_intent(), "0xabc");
        let err = client.submit(&payload, &test_wallet()).await.unwrap_err();
        assert!(matches!(err, EngineError::SubmissionRejected(_)));
        assert!(err.to_string().contains("INSUFFICIENT_BALANCE"));
    }

    #[tokio::test]
    async fn finality_succeeds_after_pending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions/by_hash/0x1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "pending_transaction", "hash": "0x1"
            })))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/transactions/by_hash/0x1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "user_transaction", "success": true, "vm_status": "Executed successfully"
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        client
            .await_finality(&TxHandle::new("0x1"), Duration::from_secs(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reverted_transaction_fails_distinctly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions/by_hash/0x2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "user_transaction", "success": false, "vm_status": "ABORTED"
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client
            .await_finality(&TxHandle::new("0x2"), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TransactionFailed { .. }));
        assert!(!err.is_ambiguous());
    }

    #[tokio::test]
    async fn finality_times_out_when_stuck_pending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions/by_hash/0x3"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "transaction not found"
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client
            .await_finality(&TxHandle::new("0x3"), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::FinalityTimeout { .. }));
        assert!(err.is_ambiguous());
    }

    #[tokio::test]
    async fn positions_decode_string_encoded_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts/0xabc/positions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "uid": "1",
                "pair_type": "0x5ae::pair_types::BTC_USD",
                "size": "300000000",
                "collateral": "10000000",
                "avg_price": "97000000000",
                "is_long": true,
                "take_profit_trigger_price": "116400000000"
            }])))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let positions = client.get_positions("0xabc").await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].uid, 1);
        assert_eq!(positions[0].size, 300_000_000);
        assert!(positions[0].is_long);
    }
}
