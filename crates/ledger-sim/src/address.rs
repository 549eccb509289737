//! Account identifier allocation and tracking.
//!
//! The [`AddressSpace`] is the leaf the rest of the engine hangs off: it
//! tracks which 20-byte identifiers are occupied, which of them carry
//! executable logic, and hands out fresh sequential identifiers for
//! non-deterministic creation.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use alloy_primitives::{keccak256, map::HashMap, Address};
use tracing::trace;

use crate::{ContractLogic, SimError};

/// What occupies an address.
#[derive(Clone)]
pub enum AccountEntry {
    /// An account with no executable logic.
    ExternallyOwned,
    /// A contract account and its logic.
    Contract(Arc<dyn ContractLogic>),
}

impl fmt::Debug for AccountEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExternallyOwned => f.write_str("ExternallyOwned"),
            Self::Contract(_) => f.write_str("Contract(..)"),
        }
    }
}

#[derive(Debug, Default)]
struct SpaceInner {
    accounts: HashMap<Address, AccountEntry>,
    next_sequential: u64,
}

/// Allocates and tracks opaque account identifiers.
///
/// Occupation is permanent: an address never reverts to unoccupied while the
/// space lives, mirroring the irreversibility of on-chain account creation.
/// All mutation happens inside a single critical section per space; logic
/// handles are cloned out of the lock before being invoked so delegated
/// calls may reenter the space.
#[derive(Debug, Default)]
pub struct AddressSpace {
    inner: Mutex<SpaceInner>,
}

impl AddressSpace {
    /// Creates an empty address space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a fresh, previously unoccupied address and tracks it as an
    /// externally owned account.
    ///
    /// Sequential identifiers are hashed into the address space so they are
    /// distinct from any hash-derived clone address with overwhelming
    /// probability.
    pub fn allocate(&self) -> Address {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let address = Self::mint(&mut inner);
        inner.accounts.insert(address, AccountEntry::ExternallyOwned);
        trace!(%address, "allocated account");
        address
    }

    /// Mints a fresh address and registers `logic` at it in one step.
    ///
    /// Used by the non-deterministic instantiation path, which may succeed
    /// repeatedly at distinct addresses.
    pub fn allocate_contract(&self, logic: Arc<dyn ContractLogic>) -> Address {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let address = Self::mint(&mut inner);
        inner.accounts.insert(address, AccountEntry::Contract(logic));
        trace!(%address, "allocated contract account");
        address
    }

    /// Registers `logic` at `address`.
    ///
    /// Fails with [`SimError::FailedDeployment`] if the address is already
    /// occupied; an existing occupant is never overwritten.
    pub fn register_contract(
        &self,
        address: Address,
        logic: Arc<dyn ContractLogic>,
    ) -> Result<(), SimError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.accounts.contains_key(&address) {
            return Err(SimError::FailedDeployment);
        }
        inner.accounts.insert(address, AccountEntry::Contract(logic));
        trace!(%address, "registered contract");
        Ok(())
    }

    /// Tracks `address` as an externally owned account. Idempotent; a
    /// contract already registered there is left untouched.
    pub fn register_external(&self, address: Address) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.accounts.entry(address).or_insert(AccountEntry::ExternallyOwned);
    }

    /// Returns the logic registered at `address`, if it is a contract.
    pub fn logic_of(&self, address: Address) -> Option<Arc<dyn ContractLogic>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.accounts.get(&address) {
            Some(AccountEntry::Contract(logic)) => Some(Arc::clone(logic)),
            _ => None,
        }
    }

    /// Whether `address` carries executable logic.
    pub fn is_contract(&self, address: Address) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        matches!(inner.accounts.get(&address), Some(AccountEntry::Contract(_)))
    }

    /// Whether `address` is occupied by any account.
    pub fn is_occupied(&self, address: Address) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.accounts.contains_key(&address)
    }

    /// Number of tracked accounts.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.accounts.len()
    }

    /// Whether the space tracks no accounts.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mint(inner: &mut SpaceInner) -> Address {
        loop {
            let n = inner.next_sequential;
            inner.next_sequential += 1;
            let mut preimage = [0u8; 32];
            preimage[..24].copy_from_slice(b"ledger-sim/sequential/v1");
            preimage[24..].copy_from_slice(&n.to_be_bytes());
            let address = Address::from_slice(&keccak256(preimage)[12..]);
            if !inner.accounts.contains_key(&address) {
                return address;
            }
        }
    }
}
