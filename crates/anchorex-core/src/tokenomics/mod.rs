//! Proposer fees and prover rewards.
//!
//! A block fee or proof reward starts from the stored fee baseline and goes through up to
//! three multipliers:
//! - **time**: lateness relative to the average block/proof time
//! - **slots**: how many proposed-but-unverified blocks occupy the available slots
//! - **bootstrap**: a discount near genesis that halves every halving period
//!
//! The getters are read-only and return the values the caller must commit; the
//! `commit_*` functions perform the writes. All intermediate math is 256-bit and results
//! saturate at `u64::MAX`.

pub mod ledger;

use alloy_primitives::U256;
use serde::Serialize;
use thiserror::Error;

use crate::{config::TokenomicsConfig, math, state::ChainState};

/// One twei in the underlying token unit (10^12).
pub const TWEI: u64 = 1_000_000_000_000;

const BPS: u64 = 10_000;
const SLOT_UNIT: u64 = 1_000;
const DISCOUNT_DENOMINATOR: u64 = 1_024;

/// Errors from fee and reward computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenomicsError {
    /// Every block slot is taken; the slot multiplier is undefined.
    #[error("no free block slots: {unverified} unverified blocks")]
    NoFreeSlots { unverified: u64 },
    /// A proof claims to be older than the block it proves.
    #[error("proven at {proven_at} before proposed at {proposed_at}")]
    ProvenBeforeProposed { proven_at: u64, proposed_at: u64 },
    /// No unverified block is left to verify.
    #[error("no unverified block to verify")]
    NothingToVerify,
    /// A configuration value makes a formula undefined.
    #[error("invalid tokenomics config: {0}")]
    InvalidConfig(&'static str),
}

/// Result of [`get_block_fee`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockFee {
    /// Fee baseline after the time adjustment, to be committed by the caller.
    pub new_fee_base: u64,
    /// Fee the proposer pays, in twei.
    pub fee: u64,
    /// Deposit the proposer locks, in twei.
    pub deposit_amount: u64,
}

/// Result of [`get_proof_reward`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProofReward {
    /// Fee baseline after the time adjustment, to be committed by the caller.
    pub new_fee_base: u64,
    /// Reward the prover earns after the burn, in twei.
    pub reward: u64,
    /// Lateness of the proof in basis points of the maximum period, `[0, 10000]`.
    pub relative_time_bp: u64,
}

/// Convert a twei amount to the token unit. A zero baseline counts as one twei.
#[inline]
pub fn from_twei(amount: u64) -> U256 {
    U256::from(amount.max(1)) * U256::from(TWEI)
}

/// Convert a token amount to twei, saturating at `u64::MAX` and never returning 0.
#[inline]
pub fn to_twei(amount: U256) -> u64 {
    math::saturate_u64(amount / U256::from(TWEI)).max(1)
}

/// Fee a proposer pays for the next block.
pub fn get_block_fee(
    state: &ChainState,
    config: &TokenomicsConfig,
    now: u64,
) -> Result<BlockFee, TokenomicsError> {
    let (new_fee_base, fee) = if state.next_block_id <= config.constant_fee_reward_blocks {
        (state.fee_base_twei, state.fee_base_twei)
    } else {
        let (new_fee_base, _) = get_time_adjusted_fee(
            config,
            state.fee_base_twei,
            true,
            now,
            state.last_proposed_at,
            state.avg_block_time,
            config.block_time_cap,
        )?;
        let fee = get_slots_adjusted_fee(state, config, true, new_fee_base)?;
        (new_fee_base, get_bootstrap_discounted_fee(state, config, fee, now)?)
    };

    let deposit_amount = math::saturate_u64(
        U256::from(fee) * U256::from(config.proposer_deposit_pctg) / U256::from(100u64),
    );

    Ok(BlockFee { new_fee_base, fee, deposit_amount })
}

/// Reward a prover earns for a block proposed at `proposed_at` and proven at `proven_at`.
pub fn get_proof_reward(
    state: &ChainState,
    config: &TokenomicsConfig,
    proven_at: u64,
    proposed_at: u64,
) -> Result<ProofReward, TokenomicsError> {
    if proposed_at > proven_at {
        return Err(TokenomicsError::ProvenBeforeProposed { proven_at, proposed_at });
    }

    let (new_fee_base, reward, relative_time_bp) =
        if state.last_block_id <= config.constant_fee_reward_blocks {
            (state.fee_base_twei, state.fee_base_twei, 0)
        } else {
            let (new_fee_base, relative_time_bp) = get_time_adjusted_fee(
                config,
                state.fee_base_twei,
                false,
                proven_at,
                proposed_at,
                state.avg_proof_time,
                config.proof_time_cap,
            )?;
            let reward = get_slots_adjusted_fee(state, config, false, new_fee_base)?;
            (new_fee_base, reward, relative_time_bp)
        };

    let keep = U256::from(BPS)
        .checked_sub(U256::from(config.reward_burn_bips))
        .ok_or(TokenomicsError::InvalidConfig("reward burn above 10000 bips"))?;
    let reward = math::saturate_u64(U256::from(reward) * keep / U256::from(BPS));

    Ok(ProofReward { new_fee_base, reward, relative_time_bp })
}

/// Scale `fee_base` by the scarcity of free block slots.
///
/// With `m = 1000 * (max_num_blocks - 1) + slot_smoothing_factor`, `n = 1000 * unverified`
/// and `k = m - n - 1000` for proposals or `m - n + 1000` for rewards, the result is
/// `fee_base * (m - 1000) * m / (m - n) / k`, each division floored in that order.
pub fn get_slots_adjusted_fee(
    state: &ChainState,
    config: &TokenomicsConfig,
    is_proposal: bool,
    fee_base: u64,
) -> Result<u64, TokenomicsError> {
    let unit = U256::from(SLOT_UNIT);
    let unverified = state.unverified_blocks();
    let no_free_slots = TokenomicsError::NoFreeSlots { unverified };

    let m = unit * U256::from(config.max_num_blocks.saturating_sub(1))
        + U256::from(config.slot_smoothing_factor);
    let n = unit * U256::from(unverified);

    let scaled_slots =
        m.checked_sub(unit).ok_or(TokenomicsError::InvalidConfig("max_num_blocks below 2"))?;
    let free = m.checked_sub(n).filter(|f| !f.is_zero()).ok_or(no_free_slots.clone())?;
    let k = if is_proposal { free.checked_sub(unit) } else { Some(free + unit) }
        .filter(|k| !k.is_zero())
        .ok_or(no_free_slots)?;

    Ok(math::saturate_u64(U256::from(fee_base) * scaled_slots * m / free / k))
}

/// Apply the bootstrap discount: `fee_base * (1024 - (1024 >> halves)) / 1024` where
/// `halves = (now - genesis) / halving_period`.
///
/// At genesis the discount is total; it shrinks by half every period and vanishes once the
/// shift exceeds the word size.
pub fn get_bootstrap_discounted_fee(
    state: &ChainState,
    config: &TokenomicsConfig,
    fee_base: u64,
    now: u64,
) -> Result<u64, TokenomicsError> {
    let halves = now
        .saturating_sub(state.genesis_timestamp)
        .checked_div(config.bootstrap_discount_halving_period)
        .ok_or(TokenomicsError::InvalidConfig("bootstrap halving period is zero"))?;

    let remaining = u32::try_from(halves)
        .ok()
        .and_then(|h| DISCOUNT_DENOMINATOR.checked_shr(h))
        .unwrap_or(0);
    let gamma = DISCOUNT_DENOMINATOR - remaining;

    let fee = u128::from(fee_base) * u128::from(gamma) / u128::from(DISCOUNT_DENOMINATOR);
    // gamma <= 1024, so the result never exceeds fee_base
    Ok(fee as u64)
}

/// Scale `fee_base` by lateness.
///
/// Returns `(new_fee_base, relative_time_bp)`. `t_now` and `t_last` are in seconds,
/// `t_avg` and `t_cap` in milliseconds. A zero average leaves the fee untouched.
///
/// ```text
/// t_avg'     = min(t_avg, t_cap)
/// t_max      = fee_max_period_pctg * t_avg' / 100
/// grace      = t_last * 1000 + fee_grace_period_pctg * t_avg' / 100
/// rel_bp     = min(max(t_now * 1000 - grace, 0), t_max) * 10000 / t_max
/// alpha      = 10000 + (reward_multiplier_pctg - 100) * rel_bp / 100
/// proposal:  fee_base * 10000 / alpha
/// reward:    fee_base * alpha / 10000
/// ```
pub fn get_time_adjusted_fee(
    config: &TokenomicsConfig,
    fee_base: u64,
    is_proposal: bool,
    t_now: u64,
    t_last: u64,
    t_avg: u64,
    t_cap: u64,
) -> Result<(u64, u64), TokenomicsError> {
    if t_avg == 0 {
        return Ok((fee_base, 0));
    }

    let hundred = U256::from(100u64);
    let bps = U256::from(BPS);
    let t_avg = U256::from(t_avg.min(t_cap));

    let t_max = U256::from(config.fee_max_period_pctg) * t_avg / hundred;
    if t_max.is_zero() {
        return Err(TokenomicsError::InvalidConfig("fee max period rounds to zero"));
    }
    let grace_point = U256::from(t_last) * U256::from(1_000u64)
        + U256::from(config.fee_grace_period_pctg) * t_avg / hundred;
    let elapsed = (U256::from(t_now) * U256::from(1_000u64)).saturating_sub(grace_point);

    let relative_time_bp = elapsed.min(t_max) * bps / t_max;

    let multiplier_pctg = U256::from(config.reward_multiplier_pctg)
        .checked_sub(hundred)
        .ok_or(TokenomicsError::InvalidConfig("reward multiplier below 100%"))?;
    let alpha = bps + multiplier_pctg * relative_time_bp / hundred;

    let new_fee_base = if is_proposal {
        U256::from(fee_base) * bps / alpha
    } else {
        U256::from(fee_base) * alpha / bps
    };

    Ok((math::saturate_u64(new_fee_base), math::saturate_u64(relative_time_bp)))
}

/// Exponential moving average: `(ma * (factor - 1) + value) / factor`.
///
/// A zero average adopts `value` outright, and a result of zero keeps the old average.
pub fn moving_average(ma: u64, value: u64, factor: u64) -> u64 {
    if ma == 0 {
        return value;
    }
    let factor = u128::from(factor.max(1));
    let next = (u128::from(ma) * (factor - 1) + u128::from(value)) / factor;
    // the weighted mean of two u64 values fits in u64
    match next as u64 {
        0 => ma,
        next => next,
    }
}

/// Commit a proposal priced by [`get_block_fee`] at `now`.
///
/// Stores the new fee baseline, folds the block interval into the average block time and
/// allocates the next block id.
pub fn commit_proposal(
    state: &mut ChainState,
    config: &TokenomicsConfig,
    fee: &BlockFee,
    now: u64,
) {
    let interval_ms = now.saturating_sub(state.last_proposed_at).saturating_mul(1_000);
    if state.last_proposed_at != 0 {
        state.avg_block_time =
            moving_average(state.avg_block_time, interval_ms, config.block_time_ma_factor);
    }
    state.commit_fee_base(fee.new_fee_base);
    state.last_proposed_at = now;
    state.next_block_id = state.next_block_id.saturating_add(1);

    tracing::trace!(
        target: "anchorex::tokenomics",
        block_id = state.next_block_id - 1,
        fee = fee.fee,
        fee_base = state.fee_base_twei,
        avg_block_time = state.avg_block_time,
        "committed proposal"
    );
}

/// Commit the verification of the oldest unverified block, priced by [`get_proof_reward`].
///
/// The fee baseline moves toward the reward's baseline by the fee-base moving average
/// rather than jumping to it.
pub fn commit_verification(
    state: &mut ChainState,
    config: &TokenomicsConfig,
    reward: &ProofReward,
    proven_at: u64,
    proposed_at: u64,
) -> Result<(), TokenomicsError> {
    if state.unverified_blocks() == 0 {
        return Err(TokenomicsError::NothingToVerify);
    }
    if proposed_at > proven_at {
        return Err(TokenomicsError::ProvenBeforeProposed { proven_at, proposed_at });
    }

    let proof_time_ms = (proven_at - proposed_at).saturating_mul(1_000);
    state.commit_fee_base(moving_average(
        state.fee_base_twei,
        reward.new_fee_base,
        config.fee_base_ma_factor,
    ));
    state.avg_proof_time =
        moving_average(state.avg_proof_time, proof_time_ms, config.proof_time_ma_factor);
    state.last_block_id += 1;

    tracing::trace!(
        target: "anchorex::tokenomics",
        block_id = state.last_block_id,
        reward = reward.reward,
        fee_base = state.fee_base_twei,
        avg_proof_time = state.avg_proof_time,
        "committed verification"
    );
    Ok(())
}
