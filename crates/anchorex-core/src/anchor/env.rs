//! Collaborators the anchor protocol reads from: the executing block and the caller check.

use alloy_primitives::{address, Address, B256};

/// The designated system account allowed to anchor.
pub const GOLDEN_TOUCH_ADDRESS: Address = address!("0000777735367b36bC9B61C50022d9D0700dB4Ec");

/// View of the block being executed, as the native chain exposes it.
pub trait BlockEnv {
    /// Height of the executing block.
    fn number(&self) -> u64;
    /// Block timestamp in seconds.
    fn timestamp(&self) -> u64;
    /// Base fee the block enforces.
    fn basefee(&self) -> u64;
    fn gas_limit(&self) -> u64;
    fn coinbase(&self) -> Address;
    fn prevrandao(&self) -> B256;
    fn chain_id(&self) -> u64;
    /// Hash of block `number`. Only the 256 blocks before the executing one are
    /// available; anything else is zero.
    fn blockhash(&self, number: u64) -> B256;
}

/// Decides whether an account may call [`L2Anchor::anchor`](super::L2Anchor::anchor).
pub trait Authorizer {
    fn is_authorized(&self, caller: &Address) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&Address) -> bool,
{
    fn is_authorized(&self, caller: &Address) -> bool {
        self(caller)
    }
}

/// Authorizes exactly one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoldenTouch(pub Address);

impl Default for GoldenTouch {
    fn default() -> Self {
        Self(GOLDEN_TOUCH_ADDRESS)
    }
}

impl Authorizer for GoldenTouch {
    #[inline]
    fn is_authorized(&self, caller: &Address) -> bool {
        *caller == self.0
    }
}
