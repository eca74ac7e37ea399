//! Fee market, tokenomics and block anchoring for an L2 canonical chain.
//!
//! This crate holds the consensus-critical logic every L2 block runs through:
//! - EIP-1559 style base fee derived from accumulated gas excess ([`fee_market`])
//! - Proposer fees, prover rewards and the fee deposit ledger ([`tokenomics`])
//! - The once-per-block anchoring call that proves continuity of the last 256 blocks,
//!   records the latest L1 block and enforces the base fee ([`anchor`])
//! - The chain state record these operate on, and its packed layout ([`state`])
//!
//! Everything here is integer math with explicit floor division and saturation. No
//! floating point, no I/O.

pub mod anchor;
pub mod config;
pub mod fee_market;
pub mod state;
pub mod tokenomics;

mod math;

#[cfg(test)]
mod tests;

pub use anchor::{
    calc_public_input_hash, get_block_hash, get_cross_chain_block_hash,
    get_cross_chain_signal_root, AnchorError, AnchorInput, AnchorReceipt, Anchored, Authorizer,
    BlockEnv, CrossChainSynced, GoldenTouch, HashWindow, L2Anchor, GOLDEN_TOUCH_ADDRESS,
    NATIVE_LOOKBACK,
};
pub use config::{Eip1559Config, TokenomicsConfig};
pub use fee_market::{
    calc_eip1559_config, calc_scales, compute_basefee, exp_wad, realised_ratio_2x1x, CurveError,
    ExpCurve, FeeMarketError, PriceCurve, MAX_EXP_INPUT, WAD,
};
pub use state::{ChainState, L1Verified, LayoutError, STATE_LAYOUT_VERSION, STATE_RECORD_LEN};
pub use tokenomics::{
    commit_proposal, commit_verification, from_twei, get_block_fee,
    get_bootstrap_discounted_fee, get_proof_reward, get_slots_adjusted_fee, get_time_adjusted_fee,
    ledger::{deposit, withdraw, LedgerError, Resolver, Token, TokenError, TOKEN_NAME},
    moving_average, to_twei, BlockFee, ProofReward, TokenomicsError, TWEI,
};
