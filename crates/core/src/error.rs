//! Error taxonomy for the trade-lifecycle engine.
//!
//! Every failure kind a caller can act on is a distinct variant; nothing is
//! collapsed into a generic internal error except truly unexpected faults.

use crate::types::Pair;
use thiserror::Error;

/// Errors produced by the trade-lifecycle engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No wallet exists for the user; registration is required first.
    #[error("user {user_id} is not registered")]
    UserNotRegistered {
        /// The unregistered user id.
        user_id: String,
    },

    /// A close was requested but no matching open position exists.
    /// No transaction has been submitted.
    #[error("no open {pair} position")]
    PositionNotFound {
        /// The pair that had no open position.
        pair: Pair,
    },

    /// The settlement layer rejected the submission. Non-retryable; remote
    /// state is unknown, so the same intent is never resubmitted automatically.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// Finality polling timed out. The transaction may or may not have
    /// landed; the caller must run a read-only reconciliation pass before
    /// allowing a new execution.
    #[error("timed out waiting for finality of {tx_hash}; outcome is unknown")]
    FinalityTimeout {
        /// Hash of the transaction with the ambiguous outcome.
        tx_hash: String,
    },

    /// The transaction settled but its on-chain execution reverted.
    #[error("transaction {tx_hash} failed on-chain: {vm_status}")]
    TransactionFailed {
        /// Hash of the reverted transaction.
        tx_hash: String,
        /// Status string reported by the settlement layer.
        vm_status: String,
    },

    /// Post-settlement position state did not match the expected outcome.
    /// The settled transaction hash is still recorded; chain state is ground
    /// truth, not local inference.
    #[error("settled {tx_hash} but {pair} state does not match the expected outcome")]
    ReconciliationMismatch {
        /// The pair whose state was inspected.
        pair: Pair,
        /// Hash of the already-settled transaction.
        tx_hash: String,
    },

    /// The backing store could not be read or written before any remote
    /// effect took place.
    #[error("storage unavailable: {0}")]
    Storage(String),

    /// The ledger append failed after the transaction already settled. The
    /// hash is preserved so the append can be retried without resubmitting.
    #[error("storage unavailable after settlement of {tx_hash}: {reason}")]
    StorageAfterSettlement {
        /// Hash of the settled transaction whose record is missing.
        tx_hash: String,
        /// Underlying storage failure.
        reason: String,
    },

    /// Another execution for the same user has not reached a terminal state.
    #[error("an execution is already in flight for user {user_id}")]
    ExecutionInProgress {
        /// The user with an in-flight execution.
        user_id: String,
    },

    /// Unexpected fault; logged with full detail and reported generically.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Creates a storage error from any displayable source.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// Creates a post-settlement storage error preserving the tx hash.
    pub fn storage_after_settlement(
        tx_hash: impl Into<String>,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::StorageAfterSettlement {
            tx_hash: tx_hash.into(),
            reason: err.to_string(),
        }
    }

    /// Creates an internal error from any displayable source.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    /// Returns true if the outcome of the execution is unknown and a
    /// read-only reconciliation pass is required before trading again.
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::FinalityTimeout { .. })
    }

    /// Returns the settled transaction hash carried by errors that occur
    /// after the on-chain effect already succeeded.
    #[must_use]
    pub fn settled_tx_hash(&self) -> Option<&str> {
        match self {
            Self::StorageAfterSettlement { tx_hash, .. }
            | Self::ReconciliationMismatch { tx_hash, .. } => Some(tx_hash),
            _ => None,
        }
    }

    /// Stable machine-readable kind tag, used by the HTTP gateway.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UserNotRegistered { .. } => "user_not_registered",
            Self::PositionNotFound { .. } => "position_not_found",
            Self::SubmissionRejected(_) => "submission_rejected",
            Self::FinalityTimeout { .. } => "ambiguous_outcome",
            Self::TransactionFailed { .. } => "transaction_failed",
            Self::ReconciliationMismatch { .. } => "reconciliation_mismatch",
            Self::Storage(_) => "storage_unavailable",
            Self::StorageAfterSettlement { .. } => "storage_unavailable_after_settlement",
            Self::ExecutionInProgress { .. } => "execution_in_progress",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Human-readable message relayed through the chat and HTTP gateways.
    /// Every kind maps to distinct text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UserNotRegistered { .. } => {
                "No wallet found. Use /start to register first.".to_string()
            }
            Self::PositionNotFound { pair } => {
                format!("No open {pair} position to close.")
            }
            Self::SubmissionRejected(reason) => {
                format!("The exchange rejected the order: {reason}. Nothing was executed.")
            }
            Self::FinalityTimeout { tx_hash } => format!(
                "Timed out waiting for confirmation of {tx_hash}. \
                 The trade may still have landed; run /reconcile before trading again."
            ),
            Self::TransactionFailed { tx_hash, vm_status } => {
                format!("Transaction {tx_hash} failed on-chain ({vm_status}).")
            }
            Self::ReconciliationMismatch { pair, tx_hash } => format!(
                "Trade {tx_hash} settled, but the {pair} position did not show \
                 the expected state. The trade was recorded; please verify on the explorer."
            ),
            Self::Storage(_) => "Account storage is temporarily unavailable.".to_string(),
            Self::StorageAfterSettlement { tx_hash, .. } => format!(
                "Trade {tx_hash} settled but could not be recorded locally. \
                 It will not be resubmitted; the record can be retried safely."
            ),
            Self::ExecutionInProgress { .. } => {
                "A trade is already in progress for your account. \
                 Wait for it to finish before sending another."
                    .to_string()
            }
            Self::Internal(_) => "Something went wrong. Please try again later.".to_string(),
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finality_timeout_is_ambiguous() {
        let err = EngineError::FinalityTimeout {
            tx_hash: "0xabc".to_string(),
        };
        assert!(err.is_ambiguous());
    }

    #[test]
    fn transaction_failed_is_not_ambiguous() {
        let err = EngineError::TransactionFailed {
            tx_hash: "0xabc".to_string(),
            vm_status: "OUT_OF_GAS".to_string(),
        };
        assert!(!err.is_ambiguous());
        assert!(err.to_string().contains("OUT_OF_GAS"));
    }

    #[test]
    fn storage_after_settlement_preserves_hash() {
        let err = EngineError::storage_after_settlement("0xdeadbeef", "disk full");
        assert_eq!(err.settled_tx_hash(), Some("0xdeadbeef"));
        assert!(err.to_string().contains("0xdeadbeef"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn reconciliation_mismatch_preserves_hash() {
        let err = EngineError::ReconciliationMismatch {
            pair: Pair::BtcUsd,
            tx_hash: "0xdeadbeef".to_string(),
        };
        assert_eq!(err.settled_tx_hash(), Some("0xdeadbeef"));
    }

    #[test]
    fn pre_submission_errors_carry_no_settled_hash() {
        let err = EngineError::SubmissionRejected("insufficient funds".to_string());
        assert_eq!(err.settled_tx_hash(), None);
    }

    #[test]
    fn user_messages_are_distinct_per_kind() {
        let errors = [
            EngineError::UserNotRegistered {
                user_id: "u1".to_string(),
            },
            EngineError::PositionNotFound { pair: Pair::BtcUsd },
            EngineError::SubmissionRejected("x".to_string()),
            EngineError::FinalityTimeout {
                tx_hash: "0x1".to_string(),
            },
            EngineError::TransactionFailed {
                tx_hash: "0x1".to_string(),
                vm_status: "x".to_string(),
            },
            EngineError::ReconciliationMismatch {
                pair: Pair::BtcUsd,
                tx_hash: "0x1".to_string(),
            },
            EngineError::Storage("x".to_string()),
            EngineError::storage_after_settlement("0x1", "x"),
            EngineError::ExecutionInProgress {
                user_id: "u1".to_string(),
            },
            EngineError::Internal("x".to_string()),
        ];
        let messages: Vec<String> = errors.iter().map(EngineError::user_message).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
