//! Deterministic and sequential proxy instantiation.
//!
//! The factory derives instance addresses as a pure function of
//! `(implementation, salt, deployer)` so they can be predicted before
//! creation, refuses to redeploy at an occupied address, and registers a
//! bound proxy at every created instance for later dispatch.

use std::sync::{Arc, Mutex};

use alloy_primitives::{keccak256, map::HashMap, Address, Bytes, B256, U256};
use auto_impl::auto_impl;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BoundProxy, ContractLogic, ProxyDispatcher, SimError};

/// Opaque salt for deterministic derivation.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Deref,
    derive_more::From,
)]
pub struct Salt(pub B256);

impl Salt {
    /// A salt with all bytes zero.
    pub const ZERO: Self = Self(B256::ZERO);

    /// Builds a salt from a small integer, big-endian padded.
    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value).into())
    }
}

/// Spendable-balance queries, consumed by the factory's value check.
///
/// Balances, allowances and transfer semantics live in an external token
/// ledger; this engine only asks how much a deployer can spend.
#[auto_impl(&, Arc)]
pub trait BalanceSource {
    /// The spendable balance of `account`.
    fn balance_of(&self, account: Address) -> U256;
}

/// Durable record associating a created instance with its implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneRecord {
    /// The implementation the instance forwards to.
    pub implementation: Address,
    /// The salt used for deterministic derivation, if any.
    pub salt: Option<Salt>,
    /// The account that created the instance.
    pub deployer: Address,
}

/// Creates proxy instances bound to an implementation.
#[derive(Debug)]
pub struct CloneFactory<B> {
    dispatcher: ProxyDispatcher,
    balances: B,
    records: Mutex<HashMap<Address, CloneRecord>>,
}

impl<B: BalanceSource> CloneFactory<B> {
    /// Creates a factory deploying into `dispatcher`'s address space, with
    /// value checks against `balances`.
    pub fn new(dispatcher: ProxyDispatcher, balances: B) -> Self {
        Self { dispatcher, balances, records: Mutex::new(HashMap::default()) }
    }

    /// Computes the instance address for `(implementation, salt, deployer)`.
    ///
    /// Pure and deterministic: identical inputs yield the identical address
    /// across calls and across processes, with no process-local randomness
    /// or counters involved. Distinct inputs collide only with the hash
    /// function's negligible probability. The packing is CREATE2-shaped:
    /// `keccak256(0xff ++ deployer ++ salt ++ keccak256(implementation))[12..]`.
    pub fn derive(implementation: Address, salt: Salt, deployer: Address) -> Address {
        deployer.create2(salt.0, keccak256(implementation))
    }

    /// Creates the proxy instance for `(implementation, salt)` at its
    /// derived address.
    ///
    /// Fails with [`SimError::InsufficientBalance`] if `deployer` cannot
    /// cover `value` (no record is created), and with
    /// [`SimError::FailedDeployment`] if the derived address is already
    /// occupied — an existing instance is never overwritten.
    pub fn instantiate_deterministic(
        &self,
        deployer: Address,
        implementation: Address,
        salt: Salt,
        value: U256,
    ) -> Result<Address, SimError> {
        self.check_value(deployer, value)?;
        let instance = Self::derive(implementation, salt, deployer);
        let logic = self.bound_logic(implementation);
        self.dispatcher.space().register_contract(instance, logic)?;
        self.record(instance, CloneRecord { implementation, salt: Some(salt), deployer });
        debug!(%instance, %implementation, %deployer, "deterministic clone created");
        Ok(instance)
    }

    /// Creates a proxy instance for `implementation` at a fresh,
    /// sequentially allocated address.
    ///
    /// Unlike the deterministic variant this may succeed repeatedly for the
    /// same `(deployer, implementation)`, each call yielding a distinct
    /// instance.
    pub fn instantiate(
        &self,
        deployer: Address,
        implementation: Address,
        value: U256,
    ) -> Result<Address, SimError> {
        self.check_value(deployer, value)?;
        let logic = self.bound_logic(implementation);
        let instance = self.dispatcher.space().allocate_contract(logic);
        self.record(instance, CloneRecord { implementation, salt: None, deployer });
        debug!(%instance, %implementation, %deployer, "clone created");
        Ok(instance)
    }

    /// The implementation a created instance forwards to, if `instance` was
    /// created by this factory.
    pub fn implementation_of(&self, instance: Address) -> Option<Address> {
        self.record_of(instance).map(|record| record.implementation)
    }

    /// The creation record for `instance`, if created by this factory.
    pub fn record_of(&self, instance: Address) -> Option<CloneRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.get(&instance).copied()
    }

    fn check_value(&self, deployer: Address, value: U256) -> Result<(), SimError> {
        let available = self.balances.balance_of(deployer);
        if available < value {
            return Err(SimError::InsufficientBalance { available, requested: value });
        }
        Ok(())
    }

    fn bound_logic(&self, implementation: Address) -> Arc<dyn ContractLogic> {
        Arc::new(CloneLogic {
            dispatcher: self.dispatcher.clone(),
            resolver: BoundProxy::new(implementation),
        })
    }

    fn record(&self, instance: Address, record: CloneRecord) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(instance, record);
    }
}

/// The logic installed at a clone address: forwards everything to the bound
/// implementation through the dispatcher.
struct CloneLogic {
    dispatcher: ProxyDispatcher,
    resolver: BoundProxy,
}

impl ContractLogic for CloneLogic {
    fn call(&self, input: &Bytes) -> Result<Bytes, Bytes> {
        self.dispatcher.dispatch(&self.resolver, input)
    }

    fn on_receive(
        &self,
        operator: Address,
        from: Address,
        token_id: U256,
        data: &Bytes,
    ) -> Result<bool, Bytes> {
        // The acceptance hook forwards like any other call. A bound
        // implementation without logic means the check is skipped upstream,
        // so report acceptance here as well.
        match self.dispatcher.space().logic_of(self.resolver.implementation()) {
            Some(logic) => logic.on_receive(operator, from, token_id, data),
            None => Ok(true),
        }
    }
}
