//! Receiver acceptance checks for transfer-like operations.

use alloy_primitives::{Address, Bytes, U256};
use tracing::trace;

use crate::{AddressSpace, SimError};

/// Checks whether `target` accepts a transfer-like operation.
///
/// A target without executable logic is treated as automatically accepting
/// (the check is skipped). A contract target is consulted through its
/// [`on_receive`](crate::ContractLogic::on_receive) hook:
///
/// - `Ok(true)` accepts the operation;
/// - `Ok(false)` and failures with no payload reject it with
///   [`SimError::InvalidReceiver`];
/// - failures with a payload are propagated verbatim as
///   [`SimError::Revert`], mirroring the dispatcher's forwarding contract.
pub fn check_receiver(
    space: &AddressSpace,
    operator: Address,
    from: Address,
    target: Address,
    token_id: U256,
    data: &Bytes,
) -> Result<(), SimError> {
    let Some(logic) = space.logic_of(target) else {
        trace!(%target, "receiver check skipped for non-contract");
        return Ok(());
    };
    match logic.on_receive(operator, from, token_id, data) {
        Ok(true) => Ok(()),
        Ok(false) => Err(SimError::InvalidReceiver { target }),
        Err(output) if output.is_empty() => Err(SimError::InvalidReceiver { target }),
        Err(output) => Err(SimError::Revert { output }),
    }
}
