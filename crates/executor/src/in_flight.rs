//! Per-user in-flight execution guard.
//!
//! Remote account state (nonce, position) is not safely shared across
//! concurrent submissions from the same signer, so at most one execution per
//! user may be in flight. Distinct users run fully in parallel.

use parking_lot::Mutex;
use perp_bot_core::{EngineError, Result};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Default)]
pub(crate) struct InFlightGuard {
    active: Arc<Mutex<HashSet<String>>>,
}

impl InFlightGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claims the user's execution slot, or fails with `ExecutionInProgress`.
    /// The slot is released when the returned token drops, on every exit path.
    pub(crate) fn acquire(&self, user_id: &str) -> Result<InFlightSlot> {
        let mut active = self.active.lock();
        if !active.insert(user_id.to_string()) {
            return Err(EngineError::ExecutionInProgress {
                user_id: user_id.to_string(),
            });
        }
        Ok(InFlightSlot {
            active: Arc::clone(&self.active),
            user_id: user_id.to_string(),
        })
    }
}

pub(crate) struct InFlightSlot {
    active: Arc<Mutex<HashSet<String>>>,
    user_id: String,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.active.lock().remove(&self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_for_same_user_is_rejected() {
        let guard = InFlightGuard::new();
        let _slot = guard.acquire("u1").unwrap();
        assert!(matches!(
            guard.acquire("u1"),
            Err(EngineError::ExecutionInProgress { .. })
        ));
    }

    #[test]
    fn distinct_users_are_independent() {
        let guard = InFlightGuard::new();
        let _a = guard.acquire("u1").unwrap();
        let _b = guard.acquire("u2").unwrap();
    }

    #[test]
    fn slot_release_allows_reacquire() {
        let guard = InFlightGuard::new();
        drop(guard.acquire("u1").unwrap());
        guard.acquire("u1").unwrap();
    }
}
