//! Error types for the simulation engine.

use alloy_primitives::{Address, Bytes, U256};

/// Failure kinds raised by the engine.
///
/// Every failure is terminal to the invocation that raised it: there is no
/// automatic retry, and state changes performed before the failure remain in
/// place unless a variant documents otherwise. Failure payloads produced by
/// delegated logic are carried verbatim in [`SimError::Revert`] rather than
/// being re-wrapped or summarized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// A checked nonce consumption did not match the expected value.
    ///
    /// `current` is the nonce that was actually consumed; the counter has
    /// already advanced past it and is not rolled back.
    #[error("invalid nonce for account {account}: consumed {current}")]
    InvalidNonce {
        /// The account whose nonce was consumed.
        account: Address,
        /// The nonce value that was consumed by the failed check.
        current: U256,
    },
    /// A protected region was entered while already active.
    #[error("reentrant call")]
    ReentrantCall,
    /// The deployer cannot cover the value attached to an instantiation.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The deployer's spendable balance.
        available: U256,
        /// The value the instantiation asked for.
        requested: U256,
    },
    /// Creation was refused because the target address is already occupied.
    #[error("deployment failed")]
    FailedDeployment,
    /// A transfer target rejected the payload or offers no acceptance hook.
    #[error("invalid receiver {target}")]
    InvalidReceiver {
        /// The account that rejected the transfer.
        target: Address,
    },
    /// A counter could not be advanced without wrapping.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    /// Delegated logic failed with a payload, carried byte-for-byte.
    #[error("delegated call reverted ({} byte output)", output.len())]
    Revert {
        /// The failure payload exactly as the delegated logic produced it.
        output: Bytes,
    },
}
