//! Engine configuration.
//!
//! Both structs are supplied from outside the engine and are immutable for the duration
//! of a call. [`TokenomicsConfig`] defaults mirror the alpha testnet parameter set.

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::tokenomics::TokenomicsError;

/// Fee-market curve parameters.
///
/// Derived once from (target base fee, gas target, max gas excess, 2x/1x ratio) by
/// [`calc_eip1559_config`](crate::calc_eip1559_config) and fixed for the chain's lifetime
/// unless explicitly recalculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Eip1559Config {
    /// Scale applied to gas excess before exponentiation.
    pub xscale: u128,
    /// Divisor applied to the curve's output to obtain a price.
    pub yscale: u128,
    /// Gas capacity issued per second of wall-clock time. Zero disables the curve.
    pub gas_issued_per_second: u64,
}

impl Eip1559Config {
    /// Returns true if the curve is disabled and the base fee is pinned to 1.
    #[inline]
    pub const fn is_disabled(&self) -> bool {
        self.gas_issued_per_second == 0
    }
}

/// Proposer fee / prover reward parameters.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
pub struct TokenomicsConfig {
    /// While the block counter is at or below this, fees and rewards stay at the baseline.
    #[builder(default = 1024)]
    pub constant_fee_reward_blocks: u64,
    /// Number of block slots, including the one reserved for the last verified block.
    #[builder(default = 2049)]
    pub max_num_blocks: u64,
    /// Smooths the slot multiplier as the last free slots fill up.
    #[builder(default = 946_649)]
    pub slot_smoothing_factor: u64,
    /// Seconds after which the bootstrap discount halves.
    #[builder(default = 86_400)]
    pub bootstrap_discount_halving_period: u64,
    /// Lateness (percent of the average time) at which the multiplier stops growing.
    #[builder(default = 375)]
    pub fee_max_period_pctg: u16,
    /// Lateness (percent of the average time) tolerated before the multiplier kicks in.
    #[builder(default = 100)]
    pub fee_grace_period_pctg: u16,
    /// Multiplier reached at maximum lateness, in percent (100 = no change).
    #[builder(default = 400)]
    pub reward_multiplier_pctg: u16,
    /// Cap on the average block time, in milliseconds.
    #[builder(default = 48_000)]
    pub block_time_cap: u64,
    /// Cap on the average proof time, in milliseconds.
    #[builder(default = 3_600_000)]
    pub proof_time_cap: u64,
    /// Share of the block fee a proposer must deposit, in percent.
    #[builder(default = 25)]
    pub proposer_deposit_pctg: u16,
    /// Share of every proof reward that is burnt, in basis points.
    #[builder(default = 100)]
    pub reward_burn_bips: u16,
    /// Moving-average factor for the fee baseline.
    #[builder(default = 1024)]
    pub fee_base_ma_factor: u64,
    /// Moving-average factor for the block time.
    #[builder(default = 1024)]
    pub block_time_ma_factor: u64,
    /// Moving-average factor for the proof time.
    #[builder(default = 1024)]
    pub proof_time_ma_factor: u64,
}

impl Default for TokenomicsConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TokenomicsConfig {
    /// Reject parameter combinations that would make a formula divide by zero or underflow.
    pub fn validate(&self) -> Result<(), TokenomicsError> {
        if self.max_num_blocks < 2 {
            return Err(TokenomicsError::InvalidConfig("max_num_blocks must be at least 2"));
        }
        if self.bootstrap_discount_halving_period == 0 {
            return Err(TokenomicsError::InvalidConfig("bootstrap halving period is zero"));
        }
        if self.fee_max_period_pctg == 0 {
            return Err(TokenomicsError::InvalidConfig("fee max period is zero"));
        }
        if self.reward_multiplier_pctg < 100 {
            return Err(TokenomicsError::InvalidConfig("reward multiplier below 100%"));
        }
        if self.block_time_cap == 0 || self.proof_time_cap == 0 {
            return Err(TokenomicsError::InvalidConfig("time cap is zero"));
        }
        if self.reward_burn_bips > 10_000 {
            return Err(TokenomicsError::InvalidConfig("reward burn above 10000 bips"));
        }
        if self.fee_base_ma_factor == 0
            || self.block_time_ma_factor == 0
            || self.proof_time_ma_factor == 0
        {
            return Err(TokenomicsError::InvalidConfig("moving-average factor is zero"));
        }
        Ok(())
    }
}
