//! Per-account replay-protection counters.

use std::sync::Mutex;

use alloy_primitives::{map::HashMap, Address, U256};
use tracing::trace;

use crate::SimError;

/// Monotonic per-account nonce counters.
///
/// A record is implicitly created at zero on first read, only ever advances
/// by exactly one per consumption, and is never deleted. All counters are
/// mutated under one critical section per ledger, which satisfies the
/// per-account serialization discipline; invocations touching disjoint
/// ledgers proceed in parallel.
#[derive(Debug, Default)]
pub struct NonceLedger {
    counters: Mutex<HashMap<Address, U256>>,
}

impl NonceLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused nonce for `account` without consuming it.
    ///
    /// Repeated reads without an interleaved [`consume`](Self::consume)
    /// return the same value.
    pub fn current_nonce(&self, account: Address) -> U256 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.get(&account).copied().unwrap_or(U256::ZERO)
    }

    /// Consumes the current nonce for `account`: returns its value and
    /// advances the stored counter by exactly one.
    ///
    /// Fails with [`SimError::ArithmeticOverflow`] instead of wrapping; the
    /// counter is left unchanged in that case. Under realistic usage the
    /// overflow is unreachable, but it is a defined fatal condition rather
    /// than a silent wrap.
    pub fn consume(&self, account: Address) -> Result<U256, SimError> {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let slot = counters.entry(account).or_insert(U256::ZERO);
        let current = *slot;
        *slot = current.checked_add(U256::ONE).ok_or(SimError::ArithmeticOverflow)?;
        trace!(%account, nonce = %current, "consumed nonce");
        Ok(current)
    }

    /// Consumes the current nonce and checks it against `expected`.
    ///
    /// On mismatch fails with [`SimError::InvalidNonce`] carrying the nonce
    /// that was actually consumed. The consumption is NOT rolled back: the
    /// counter has already advanced, mirroring the irreversible state-commit
    /// semantics of the chain this simulates. Callers relying on the check
    /// must treat the nonce as spent either way.
    pub fn consume_checked(&self, account: Address, expected: U256) -> Result<U256, SimError> {
        let current = self.consume(account)?;
        if current != expected {
            return Err(SimError::InvalidNonce { account, current });
        }
        Ok(current)
    }

    /// Seeds the counter for `account` to `value` if it is ahead of the
    /// stored one. Useful for importing pre-existing ledger state; never
    /// decrements.
    pub fn seed(&self, account: Address, value: U256) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let slot = counters.entry(account).or_insert(U256::ZERO);
        if value > *slot {
            *slot = value;
        }
    }
}
