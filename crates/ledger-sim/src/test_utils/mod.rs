//! Test doubles for exercising the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{map::HashMap, Address, Bytes, U256};

use crate::{BalanceSource, ContractLogic};

/// Builds a recognizable address from a small integer.
pub fn test_address(n: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&n.to_be_bytes());
    Address::from(bytes)
}

/// Logic that returns its input unchanged. Keeps the default (absent)
/// acceptance hook.
#[derive(Debug, Clone, Copy)]
pub struct EchoLogic;

impl ContractLogic for EchoLogic {
    fn call(&self, input: &Bytes) -> Result<Bytes, Bytes> {
        Ok(input.clone())
    }
}

/// Logic that always fails with a fixed payload.
#[derive(Debug, Clone)]
pub struct RevertingLogic {
    output: Bytes,
}

impl RevertingLogic {
    /// Fails every call with `output`.
    pub const fn new(output: Bytes) -> Self {
        Self { output }
    }
}

impl ContractLogic for RevertingLogic {
    fn call(&self, _input: &Bytes) -> Result<Bytes, Bytes> {
        Err(self.output.clone())
    }
}

/// Logic that counts invocations and returns empty output.
#[derive(Debug, Default)]
pub struct CountingLogic {
    calls: AtomicU64,
}

impl CountingLogic {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `call` ran.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContractLogic for CountingLogic {
    fn call(&self, _input: &Bytes) -> Result<Bytes, Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::new())
    }
}

/// A receiver whose acceptance hook always accepts.
#[derive(Debug, Clone, Copy)]
pub struct AcceptingReceiver;

impl ContractLogic for AcceptingReceiver {
    fn call(&self, _input: &Bytes) -> Result<Bytes, Bytes> {
        Ok(Bytes::new())
    }

    fn on_receive(
        &self,
        _operator: Address,
        _from: Address,
        _token_id: U256,
        _data: &Bytes,
    ) -> Result<bool, Bytes> {
        Ok(true)
    }
}

/// A receiver whose acceptance hook returns a rejection signal.
#[derive(Debug, Clone, Copy)]
pub struct RejectingReceiver;

impl ContractLogic for RejectingReceiver {
    fn call(&self, _input: &Bytes) -> Result<Bytes, Bytes> {
        Ok(Bytes::new())
    }

    fn on_receive(
        &self,
        _operator: Address,
        _from: Address,
        _token_id: U256,
        _data: &Bytes,
    ) -> Result<bool, Bytes> {
        Ok(false)
    }
}

/// In-memory balance table implementing [`BalanceSource`].
#[derive(Debug, Clone, Default)]
pub struct FixedBalances {
    balances: HashMap<Address, U256>,
}

impl FixedBalances {
    /// Adds `balance` for `account`, builder style.
    pub fn with(mut self, account: Address, balance: U256) -> Self {
        self.balances.insert(account, balance);
        self
    }
}

impl BalanceSource for FixedBalances {
    fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }
}
