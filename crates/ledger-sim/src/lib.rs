//! An in-process ledger-state and proxy-dispatch simulation engine.
//!
//! The engine reproduces the externally observable semantics of a handful of
//! contract primitives without running a virtual machine: nonce-based replay
//! protection, a reentrancy guard modeled as an entry/exit state machine,
//! deterministic clone-address derivation, and verbatim call delegation
//! through proxies. It is intended for testing contract-level invariants,
//! not for running a chain.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod address;
pub use address::*;

mod context;
pub use context::*;

mod dispatch;
pub use dispatch::*;

mod error;
pub use error::*;

mod factory;
pub use factory::*;

mod guard;
pub use guard::*;

mod nonce;
pub use nonce::*;

mod receiver;
pub use receiver::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
