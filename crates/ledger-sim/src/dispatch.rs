//! Call delegation through proxies.
//!
//! A proxy forwards an invocation's input to an implementation's logic and
//! returns exactly what that logic returns; failure payloads are propagated
//! byte-for-byte rather than summarized. Resolution of *which* implementation
//! to forward to is decoupled from the forwarding itself through the
//! [`ImplementationResolver`] hook, so routing tables, upgrade slots and
//! fixed minimal-clone bindings all reuse the same dispatch path.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use auto_impl::auto_impl;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AddressSpace;

/// Executable logic bound to a contract account.
///
/// Implementations must be callable from any thread; a delegated call may
/// reenter the engine (that is the point of the reentrancy guard), so no
/// engine lock is held while `call` runs.
pub trait ContractLogic: Send + Sync {
    /// Runs the logic against `input`, returning the success output or the
    /// failure payload. Both sides of the result are opaque to the engine
    /// and are forwarded verbatim.
    fn call(&self, input: &Bytes) -> Result<Bytes, Bytes>;

    /// Acceptance hook consulted when a transfer-like operation targets this
    /// account. `Ok(true)` accepts, `Ok(false)` rejects, `Err` carries a
    /// failure payload.
    ///
    /// The default models a contract that does not implement the hook at
    /// all: a failure with an empty payload, which the receiver check turns
    /// into [`crate::SimError::InvalidReceiver`].
    fn on_receive(
        &self,
        operator: Address,
        from: Address,
        token_id: U256,
        data: &Bytes,
    ) -> Result<bool, Bytes> {
        let _ = (operator, from, token_id, data);
        Err(Bytes::new())
    }
}

/// Resolves the implementation address a proxy forwards to.
///
/// This is the overridable half of the dispatch pair: resolution may consult
/// storage, upgrade slots or routing tables, while the forwarding mechanism
/// stays fixed.
#[auto_impl(&, Arc)]
pub trait ImplementationResolver {
    /// Returns the address of the logic this proxy currently forwards to.
    fn resolve_implementation(&self) -> Address;
}

/// A minimal-clone resolver: the implementation is fixed at construction and
/// never changes for the lifetime of the proxy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundProxy {
    implementation: Address,
}

impl BoundProxy {
    /// Binds a proxy to `implementation`.
    pub const fn new(implementation: Address) -> Self {
        Self { implementation }
    }

    /// The implementation this proxy is bound to.
    pub const fn implementation(&self) -> Address {
        self.implementation
    }
}

impl ImplementationResolver for BoundProxy {
    fn resolve_implementation(&self) -> Address {
        self.implementation
    }
}

/// Dispatch behavior toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Reject delegation to accounts without executable logic.
    ///
    /// The default (`false`) preserves VM semantics where delegating to a
    /// non-contract address is a silent no-op reporting success with empty
    /// output. Strict mode turns that case into a failure with an empty
    /// payload instead, for simulations that want the asymmetry surfaced.
    pub strict_targets: bool,
}

/// Forwards invocations to implementation logic registered in an
/// [`AddressSpace`].
#[derive(Debug, Clone)]
pub struct ProxyDispatcher {
    space: Arc<AddressSpace>,
    config: DispatchConfig,
}

impl ProxyDispatcher {
    /// Creates a dispatcher over `space` with default (VM-faithful) config.
    pub fn new(space: Arc<AddressSpace>) -> Self {
        Self::with_config(space, DispatchConfig::default())
    }

    /// Creates a dispatcher over `space` with the given config.
    pub const fn with_config(space: Arc<AddressSpace>, config: DispatchConfig) -> Self {
        Self { space, config }
    }

    /// The address space this dispatcher resolves logic in.
    pub fn space(&self) -> &Arc<AddressSpace> {
        &self.space
    }

    /// Forwards `input` to the logic at `implementation` and returns its
    /// result unchanged.
    ///
    /// If `implementation` has no executable logic the call is a no-op that
    /// reports success with empty output, matching the VM's delegate
    /// semantics (see [`DispatchConfig::strict_targets`] for the opt-out).
    pub fn delegate(&self, implementation: Address, input: &Bytes) -> Result<Bytes, Bytes> {
        // The logic handle is cloned out of the space's lock before the call
        // so the delegated logic may reenter the engine.
        let Some(logic) = self.space.logic_of(implementation) else {
            debug!(%implementation, strict = self.config.strict_targets, "delegate to non-contract");
            if self.config.strict_targets {
                return Err(Bytes::new());
            }
            return Ok(Bytes::new());
        };
        debug!(%implementation, input_len = input.len(), "delegate");
        logic.call(input)
    }

    /// Resolves the implementation through `proxy` and delegates to it.
    pub fn dispatch<R: ImplementationResolver>(
        &self,
        proxy: &R,
        input: &Bytes,
    ) -> Result<Bytes, Bytes> {
        self.delegate(proxy.resolve_implementation(), input)
    }
}
