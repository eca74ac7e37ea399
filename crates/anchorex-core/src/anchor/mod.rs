//! Once-per-block anchoring.
//!
//! The first transaction of every L2 block is an anchor call from the system account. It
//! proves the chain's last 255 block hashes are the ones the protocol has seen (rolling
//! public input hash), records the newest L1 block the sequencer synced, and checks that
//! the block enforces the base fee the fee market computes.
//!
//! Every check runs before the first write, so a failing call leaves the state untouched.

mod env;
mod window;

use alloy_primitives::{Address, B256, U256};
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::Eip1559Config,
    fee_market::{compute_basefee, ExpCurve, FeeMarketError, PriceCurve},
    state::{ChainState, L1Verified},
};

pub use env::{Authorizer, BlockEnv, GoldenTouch, GOLDEN_TOUCH_ADDRESS};
pub use window::{calc_public_input_hash, HashWindow, RING_SIZE};

/// Number of recent blocks the native chain can look up by itself.
pub const NATIVE_LOOKBACK: u64 = 256;

/// Errors from [`L2Anchor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    #[error("anchor called by {0}, not the system account")]
    InvalidSender(Address),
    /// The stored hash does not commit to the chain's recent block hashes.
    #[error("public input hash mismatch: stored {expected}, computed {actual}")]
    PublicInputHashMismatch { expected: B256, actual: B256 },
    #[error("basefee mismatch: computed {expected}, block has {actual}")]
    BasefeeMismatch { expected: u64, actual: u64 },
    #[error("invalid chain id {0}")]
    InvalidChainId(u64),
    #[error("too late to initialize at block {0}")]
    TooLateForInit(u64),
    /// `init` already seeded the public input hash.
    #[error("anchor state already initialized")]
    AlreadyInitialized,
    /// Anchoring at height 0 has no parent to commit to.
    #[error("genesis block has no parent to anchor")]
    NoParentBlock,
    /// Fee-market derivation failed. This includes [`CurveError::OutOfStock`] when the
    /// gas excess is beyond the range the price curve can represent; such a block cannot
    /// be anchored until issuance drains the excess.
    ///
    /// [`CurveError::OutOfStock`]: crate::fee_market::CurveError::OutOfStock
    #[error(transparent)]
    FeeMarket(#[from] FeeMarketError),
}

/// L1 data and parent gas usage the sequencer supplies to [`L2Anchor::anchor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnchorInput {
    pub l1_hash: B256,
    pub l1_signal_root: B256,
    pub l1_height: u64,
    pub parent_gas_used: u32,
}

/// Emitted when an L1 block is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrossChainSynced {
    pub height: u64,
    pub block_hash: B256,
    pub signal_root: B256,
}

/// Block metadata emitted for the proving circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Anchored {
    pub number: u64,
    pub basefee: u64,
    pub gas_limit: u64,
    pub timestamp: u64,
    pub parent_hash: B256,
    pub prevrandao: B256,
    pub coinbase: Address,
    pub chain_id: u64,
}

/// Outcome of a successful anchor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[must_use]
pub struct AnchorReceipt {
    pub synced: CrossChainSynced,
    pub anchored: Anchored,
    /// Public input hash after the call.
    pub public_input_hash: B256,
    /// Gas excess after the call.
    pub gas_excess: u64,
}

/// The anchor protocol, parameterised by who may call it and how gas is priced.
#[derive(Debug, Clone)]
pub struct L2Anchor<A = GoldenTouch, C = ExpCurve> {
    eip1559: Eip1559Config,
    authorizer: A,
    curve: C,
}

impl L2Anchor {
    /// Anchor with the system account and the exponential curve.
    pub fn new(eip1559: Eip1559Config) -> Self {
        Self::with_parts(eip1559, GoldenTouch::default(), ExpCurve)
    }
}

impl<A: Authorizer, C: PriceCurve> L2Anchor<A, C> {
    pub fn with_parts(eip1559: Eip1559Config, authorizer: A, curve: C) -> Self {
        Self { eip1559, authorizer, curve }
    }

    /// Seed the chain state at genesis (or the block right after). Runs once.
    ///
    /// Archives the parent hash when not at height 0, seeds the public input hash and
    /// the parent timestamp, and starts the fee market at `initial_gas_excess`. Returns
    /// the seeded hash.
    pub fn init<E: BlockEnv + ?Sized>(
        &self,
        state: &mut ChainState,
        env: &E,
        initial_gas_excess: u64,
    ) -> Result<B256, AnchorError> {
        if state.public_input_hash != B256::ZERO {
            return Err(AnchorError::AlreadyInitialized);
        }
        let chain_id = env.chain_id();
        if chain_id <= 1 || chain_id == u64::MAX {
            return Err(AnchorError::InvalidChainId(chain_id));
        }
        let number = env.number();
        if number > 1 {
            return Err(AnchorError::TooLateForInit(number));
        }

        if number > 0 {
            state.l2_hashes.insert(number - 1, env.blockhash(number - 1));
        }
        let (public_input_hash, _) = calc_public_input_hash(env, number);
        state.public_input_hash = public_input_hash;
        state.parent_timestamp = env.timestamp();
        state.gas_excess = initial_gas_excess;

        tracing::info!(
            target: "anchorex::anchor",
            number,
            chain_id,
            %public_input_hash,
            gas_excess = initial_gas_excess,
            "initialized anchor state"
        );
        Ok(public_input_hash)
    }

    /// Anchor the executing block.
    ///
    /// Checks, in order: the caller, the continuity of the public input hash over the
    /// parent's window, and the block's base fee. Only then commits the new hash, the
    /// parent hash, the L1 record, the gas excess and the parent timestamp.
    pub fn anchor<E: BlockEnv + ?Sized>(
        &self,
        state: &mut ChainState,
        env: &E,
        caller: Address,
        input: &AnchorInput,
    ) -> Result<AnchorReceipt, AnchorError> {
        if !self.authorizer.is_authorized(&caller) {
            return Err(AnchorError::InvalidSender(caller));
        }

        let number = env.number();
        let parent_id = number.checked_sub(1).ok_or(AnchorError::NoParentBlock)?;

        let (prev, curr) = calc_public_input_hash(env, parent_id);
        if state.public_input_hash != prev {
            tracing::warn!(
                target: "anchorex::anchor",
                number,
                stored = %state.public_input_hash,
                computed = %prev,
                "public input hash mismatch"
            );
            return Err(AnchorError::PublicInputHashMismatch {
                expected: state.public_input_hash,
                actual: prev,
            });
        }

        let timestamp = env.timestamp();
        let (basefee, gas_excess) = compute_basefee(
            &self.curve,
            &self.eip1559,
            state.gas_excess,
            timestamp.saturating_sub(state.parent_timestamp),
            input.parent_gas_used,
        )?;
        if env.basefee() != basefee {
            return Err(AnchorError::BasefeeMismatch { expected: basefee, actual: env.basefee() });
        }

        let parent_hash = env.blockhash(parent_id);
        state.public_input_hash = curr;
        state.l2_hashes.insert(parent_id, parent_hash);
        state.l1_verified.insert(
            input.l1_height,
            L1Verified { block_hash: input.l1_hash, signal_root: input.l1_signal_root },
        );
        state.latest_synced_l1_height = input.l1_height;
        state.gas_excess = gas_excess;
        state.parent_timestamp = timestamp;

        tracing::debug!(
            target: "anchorex::anchor",
            number,
            l1_height = input.l1_height,
            basefee,
            gas_excess,
            "anchored"
        );

        Ok(AnchorReceipt {
            synced: CrossChainSynced {
                height: input.l1_height,
                block_hash: input.l1_hash,
                signal_root: input.l1_signal_root,
            },
            anchored: Anchored {
                number,
                basefee,
                gas_limit: env.gas_limit(),
                timestamp,
                parent_hash,
                prevrandao: env.prevrandao(),
                coinbase: env.coinbase(),
                chain_id: env.chain_id(),
            },
            public_input_hash: curr,
            gas_excess,
        })
    }

    /// Base fee a block would get after `time_since_parent` seconds with the parent using
    /// `parent_gas_used`. Read-only.
    pub fn get_basefee(
        &self,
        state: &ChainState,
        time_since_parent: u64,
        parent_gas_used: u32,
    ) -> Result<U256, AnchorError> {
        let (basefee, _) = compute_basefee(
            &self.curve,
            &self.eip1559,
            state.gas_excess,
            time_since_parent,
            parent_gas_used,
        )?;
        Ok(U256::from(basefee))
    }
}

/// Hash of L2 block `number` as seen from the executing block.
///
/// Zero for the executing block and anything after it, the native lookup for the last
/// 256 blocks, and the archive (zero if never anchored) for older ones.
pub fn get_block_hash<E: BlockEnv + ?Sized>(state: &ChainState, env: &E, number: u64) -> B256 {
    let current = env.number();
    if number >= current {
        B256::ZERO
    } else if number >= current.saturating_sub(NATIVE_LOOKBACK) {
        env.blockhash(number)
    } else {
        state.l2_hashes.get(&number).copied().unwrap_or_default()
    }
}

/// Hash of the L1 block at `height`; 0 means the latest synced one.
pub fn get_cross_chain_block_hash(state: &ChainState, height: u64) -> B256 {
    l1_record(state, height).block_hash
}

/// Signal root of the L1 block at `height`; 0 means the latest synced one.
pub fn get_cross_chain_signal_root(state: &ChainState, height: u64) -> B256 {
    l1_record(state, height).signal_root
}

fn l1_record(state: &ChainState, height: u64) -> L1Verified {
    let height = if height == 0 { state.latest_synced_l1_height } else { height };
    state.l1_verified.get(&height).copied().unwrap_or_default()
}
