//! Execution-context resolution for simulated invocations.
//!
//! Callers must obtain sender identity only through [`CallContext`], never
//! by inspecting the immediate invocation frame: composing layers such as
//! meta-transaction relayers report a forwarded original sender while the
//! direct invoker differs.

use alloy_primitives::{Address, Bytes};
use delegate::delegate;

/// The logical caller and payload of the current invocation.
pub trait CallContext {
    /// The logical caller of the invocation.
    fn sender(&self) -> Address;

    /// The full payload of the invocation, including any context-forwarding
    /// suffix.
    fn data(&self) -> Bytes;

    /// How many trailing bytes of [`data`](Self::data) are reserved by a
    /// context-forwarding scheme. Zero unless a composing layer overrides
    /// it.
    fn trailing_data_length(&self) -> usize {
        0
    }

    /// The payload with the context-forwarding suffix stripped, i.e. the
    /// bytes a composed parser should actually decode.
    fn payload(&self) -> Bytes {
        let data = self.data();
        let reserved = self.trailing_data_length().min(data.len());
        data.slice(..data.len() - reserved)
    }
}

/// The default context: reports the direct invoker and payload unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectCall {
    caller: Address,
    data: Bytes,
}

impl DirectCall {
    /// Creates a context for a direct invocation by `caller` with `data`.
    pub const fn new(caller: Address, data: Bytes) -> Self {
        Self { caller, data }
    }
}

impl CallContext for DirectCall {
    fn sender(&self) -> Address {
        self.caller
    }

    fn data(&self) -> Bytes {
        self.data.clone()
    }
}

/// A meta-transaction style wrapper: the original sender rides in the
/// trailing 20 bytes of the payload.
///
/// When the inner payload is long enough to carry the suffix, `sender()`
/// reports the address packed at the end and `trailing_data_length()`
/// reserves those 20 bytes so [`CallContext::payload`] excludes them.
/// Shorter payloads fall back to the direct sender, suffix-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedCall<C> {
    inner: C,
}

impl<C: CallContext> ForwardedCall<C> {
    /// Wraps `inner`, interpreting its payload suffix as the forwarded
    /// sender.
    pub const fn new(inner: C) -> Self {
        Self { inner }
    }

    fn forwarded_sender(&self) -> Option<Address> {
        let data = self.inner.data();
        let suffix_at = data.len().checked_sub(Address::len_bytes())?;
        Some(Address::from_slice(&data[suffix_at..]))
    }
}

impl<C: CallContext> CallContext for ForwardedCall<C> {
    delegate! {
        to self.inner {
            fn data(&self) -> Bytes;
        }
    }

    fn sender(&self) -> Address {
        self.forwarded_sender().unwrap_or_else(|| self.inner.sender())
    }

    fn trailing_data_length(&self) -> usize {
        if self.forwarded_sender().is_some() {
            Address::len_bytes()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_address;
    use alloy_primitives::bytes;

    #[test]
    fn test_direct_call_reports_invoker_and_payload() {
        let caller = test_address(1);
        let ctx = DirectCall::new(caller, bytes!("a1b2c3"));
        assert_eq!(ctx.sender(), caller);
        assert_eq!(ctx.data(), bytes!("a1b2c3"));
        assert_eq!(ctx.trailing_data_length(), 0);
        assert_eq!(ctx.payload(), bytes!("a1b2c3"));
    }

    #[test]
    fn test_forwarded_call_reports_trailing_sender() {
        let relayer = test_address(2);
        let original = test_address(3);
        let mut data = bytes!("11223344").to_vec();
        data.extend_from_slice(original.as_slice());
        let ctx = ForwardedCall::new(DirectCall::new(relayer, data.into()));

        assert_eq!(ctx.sender(), original);
        assert_eq!(ctx.trailing_data_length(), Address::len_bytes());
        assert_eq!(ctx.payload(), bytes!("11223344"));
    }

    #[test]
    fn test_forwarded_call_short_payload_falls_back_to_direct_sender() {
        let relayer = test_address(4);
        let ctx = ForwardedCall::new(DirectCall::new(relayer, bytes!("0102")));
        assert_eq!(ctx.sender(), relayer);
        assert_eq!(ctx.trailing_data_length(), 0);
        assert_eq!(ctx.payload(), bytes!("0102"));
    }

    #[test]
    fn test_forwarded_call_data_is_unmodified() {
        let original = test_address(5);
        let mut data = bytes!("ff").to_vec();
        data.extend_from_slice(original.as_slice());
        let data = Bytes::from(data);
        let ctx = ForwardedCall::new(DirectCall::new(test_address(6), data.clone()));
        // data() reports the raw payload; only payload() strips the suffix.
        assert_eq!(ctx.data(), data);
    }
}
