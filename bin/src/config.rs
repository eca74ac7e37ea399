use alloy_primitives::{address, Address};
use anchorex_core::{
    calc_eip1559_config, calc_scales, realised_ratio_2x1x, Eip1559Config, ExpCurve,
    TokenomicsConfig,
};
use clap::ValueEnum;
use eyre::WrapErr;

/// Chain id used when none is given.
pub const DEFAULT_CHAIN_ID: u64 = 167_001;

/// Simulated L2 block time in seconds.
pub const L2_BLOCK_TIME: u64 = 12;

/// Genesis timestamp of a fresh simulated chain (2023-11-14 22:13:20 UTC).
pub const L2_GENESIS_TIME: u64 = 1_700_000_000;

/// Proposer and prover used by the simulator.
pub const SIM_PROPOSER: Address = address!("00000000000000000000000000000000000c0ffe");
pub const SIM_PROVER: Address = address!("0000000000000000000000000000000000000b0b");

/// Fee-market inputs a config is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeMarketParams {
    pub basefee: u64,
    pub gas_issued_per_second: u64,
    pub max_gas_excess: u64,
    pub gas_target: u64,
}

impl FeeMarketParams {
    /// Derive the curve config, taking the 2x/1x ratio the curve realises for these
    /// inputs. Zero issuance yields the disabled config.
    pub fn eip1559_config(&self) -> eyre::Result<Eip1559Config> {
        if self.gas_issued_per_second == 0 {
            return Ok(Eip1559Config::default());
        }

        let (xscale, yscale) =
            calc_scales(&ExpCurve, self.basefee, self.max_gas_excess, self.gas_target)
                .wrap_err("failed to derive curve scales")?;
        let ratio =
            realised_ratio_2x1x(&ExpCurve, xscale, yscale, self.max_gas_excess, self.gas_target)?;

        calc_eip1559_config(
            &ExpCurve,
            self.basefee,
            self.gas_issued_per_second,
            self.max_gas_excess,
            self.gas_target,
            ratio,
        )
        .wrap_err("failed to derive EIP-1559 config")
    }

    /// Gas excess the fee market starts from: the curve's anchor point.
    #[inline]
    pub fn initial_gas_excess(&self) -> u64 {
        if self.gas_issued_per_second == 0 {
            0
        } else {
            self.max_gas_excess / 2
        }
    }
}

/// Named parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Preset {
    /// Alpha testnet fee market and tokenomics.
    #[default]
    Testnet,
    /// Fee market disabled, short warm-up and halving period.
    Devnet,
}

impl Preset {
    pub fn fee_market(self) -> FeeMarketParams {
        match self {
            Self::Testnet => FeeMarketParams {
                basefee: 5_000_000_000,
                gas_issued_per_second: 5_000_000,
                max_gas_excess: 90_900_000_000,
                gas_target: 60_000_000,
            },
            Self::Devnet => FeeMarketParams {
                basefee: 1,
                gas_issued_per_second: 0,
                max_gas_excess: 0,
                gas_target: 0,
            },
        }
    }

    pub fn tokenomics(self) -> TokenomicsConfig {
        match self {
            Self::Testnet => TokenomicsConfig::default(),
            Self::Devnet => TokenomicsConfig::builder()
                .constant_fee_reward_blocks(16)
                .max_num_blocks(65)
                .slot_smoothing_factor(4_000)
                .bootstrap_discount_halving_period(60)
                .build(),
        }
    }

    /// Fee baseline of a fresh chain, in twei.
    pub fn initial_fee_base(self) -> u64 {
        match self {
            Self::Testnet => 1_000_000,
            Self::Devnet => 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_derive() {
        for preset in [Preset::Testnet, Preset::Devnet] {
            assert!(preset.fee_market().eip1559_config().is_ok());
            assert!(preset.tokenomics().validate().is_ok());
        }
    }

    #[test]
    fn test_devnet_disables_fee_market() {
        let params = Preset::Devnet.fee_market();
        assert!(params.eip1559_config().unwrap().is_disabled());
        assert_eq!(params.initial_gas_excess(), 0);
    }

    #[test]
    fn test_testnet_anchor_point() {
        let params = Preset::Testnet.fee_market();
        let config = params.eip1559_config().unwrap();
        assert_eq!(config.xscale, 1_488_514_844);
        assert_eq!(params.initial_gas_excess(), 45_450_000_000);
    }
}
