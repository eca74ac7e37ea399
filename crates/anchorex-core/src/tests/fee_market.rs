use alloy_primitives::U256;

use crate::{
    calc_eip1559_config, calc_scales, compute_basefee, realised_ratio_2x1x, CurveError,
    Eip1559Config, ExpCurve, FeeMarketError, PriceCurve, MAX_EXP_INPUT,
};

const BASEFEE: u64 = 5_000_000_000;
const MAX_GAS_EXCESS: u64 = 90_900_000_000;
const GAS_TARGET: u64 = 60_000_000;
const GAS_ISSUED_PER_SECOND: u64 = 5_000_000;

/// Curve that prices everything at a fixed value.
struct FlatCurve(U256);

impl PriceCurve for FlatCurve {
    fn price(&self, _: u128, _: u128, _: u64, _: u64) -> Result<U256, CurveError> {
        Ok(self.0)
    }
}

fn config() -> Eip1559Config {
    let (xscale, yscale) = calc_scales(&ExpCurve, BASEFEE, MAX_GAS_EXCESS, GAS_TARGET).unwrap();
    Eip1559Config { xscale, yscale, gas_issued_per_second: GAS_ISSUED_PER_SECOND }
}

#[test]
fn test_disabled_market_returns_one() {
    let disabled = Eip1559Config { xscale: 9, yscale: 9, gas_issued_per_second: 0 };
    let cases = [(0u64, 0u64, 0u32), (12_345, 1, 30_000_000), (u64::MAX, u64::MAX, u32::MAX)];
    for (excess, time, used) in cases {
        let (basefee, new_excess) =
            compute_basefee(&ExpCurve, &disabled, excess, time, used).unwrap();
        assert_eq!(basefee, 1);
        assert_eq!(new_excess, excess);
    }
}

#[test]
fn test_scales_for_reference_params() {
    let (xscale, yscale) = calc_scales(&ExpCurve, BASEFEE, MAX_GAS_EXCESS, GAS_TARGET).unwrap();
    assert_eq!(U256::from(xscale), MAX_EXP_INPUT / U256::from(MAX_GAS_EXCESS));
    assert_eq!(xscale, 1_488_514_844);

    // buying the target at the anchor point costs the target base fee per unit
    let price = ExpCurve.price(xscale, yscale, MAX_GAS_EXCESS / 2, GAS_TARGET).unwrap();
    assert_eq!(price, U256::from(BASEFEE));
}

#[test]
fn test_calc_config_accepts_realised_ratio() {
    let (xscale, yscale) = calc_scales(&ExpCurve, BASEFEE, MAX_GAS_EXCESS, GAS_TARGET).unwrap();
    let ratio =
        realised_ratio_2x1x(&ExpCurve, xscale, yscale, MAX_GAS_EXCESS, GAS_TARGET).unwrap();
    assert!(ratio > 10_000 && ratio < 20_000, "ratio {ratio}");

    let config = calc_eip1559_config(
        &ExpCurve,
        BASEFEE,
        GAS_ISSUED_PER_SECOND,
        MAX_GAS_EXCESS,
        GAS_TARGET,
        ratio,
    )
    .unwrap();
    let expected = Eip1559Config { xscale, yscale, gas_issued_per_second: GAS_ISSUED_PER_SECOND };
    assert_eq!(config, expected);
}

#[test]
fn test_calc_config_rejects_ratio_mismatch() {
    let (xscale, yscale) = calc_scales(&ExpCurve, BASEFEE, MAX_GAS_EXCESS, GAS_TARGET).unwrap();
    let ratio =
        realised_ratio_2x1x(&ExpCurve, xscale, yscale, MAX_GAS_EXCESS, GAS_TARGET).unwrap();

    let err = calc_eip1559_config(
        &ExpCurve,
        BASEFEE,
        GAS_ISSUED_PER_SECOND,
        MAX_GAS_EXCESS,
        GAS_TARGET,
        ratio + 1,
    )
    .unwrap_err();
    assert!(matches!(err, FeeMarketError::InvalidConfig(_)));
}

#[test]
fn test_calc_config_rejects_zero_inputs() {
    let cases = [
        (0, GAS_ISSUED_PER_SECOND, MAX_GAS_EXCESS, GAS_TARGET, 10_000),
        (BASEFEE, 0, MAX_GAS_EXCESS, GAS_TARGET, 10_000),
        (BASEFEE, GAS_ISSUED_PER_SECOND, 0, GAS_TARGET, 10_000),
        (BASEFEE, GAS_ISSUED_PER_SECOND, MAX_GAS_EXCESS, 0, 10_000),
        (BASEFEE, GAS_ISSUED_PER_SECOND, MAX_GAS_EXCESS, GAS_TARGET, 0),
    ];
    for (basefee, issued, max_excess, target, ratio) in cases {
        let err = calc_eip1559_config(&ExpCurve, basefee, issued, max_excess, target, ratio)
            .unwrap_err();
        assert!(matches!(err, FeeMarketError::InvalidConfig(_)));
    }
}

#[test]
fn test_calc_scales_rejects_oversized_yscale() {
    // a steep curve over a tiny excess range prices one unit beyond u128
    let err = calc_scales(&ExpCurve, 1, 1_000, 1).unwrap_err();
    assert!(matches!(err, FeeMarketError::InvalidConfig(_)));

    // anchor + target reaches the exponent limit
    let err = calc_scales(&ExpCurve, 1, 2, 1).unwrap_err();
    assert_eq!(err, FeeMarketError::Curve(CurveError::OutOfStock));
}

#[test]
fn test_basefee_after_parent_block() {
    let (basefee, excess) =
        compute_basefee(&ExpCurve, &config(), MAX_GAS_EXCESS / 2, 12, 30_000_000).unwrap();
    assert_eq!(excess, MAX_GAS_EXCESS / 2 - 30_000_000);
    assert_eq!(basefee, 4_571_286_582);
}

#[test]
fn test_price_never_drops_between_adjacent_excess() {
    let config = config();
    for start in [1u64, 10_000_000_000, MAX_GAS_EXCESS / 2 - 10, 80_000_000_000] {
        let mut last = ExpCurve.price(config.xscale, config.yscale, start, 0).unwrap();
        for excess in start + 1..start + 5_000 {
            let price = ExpCurve.price(config.xscale, config.yscale, excess, 0).unwrap();
            assert!(price >= last, "price dropped at excess {excess}: {last} -> {price}");
            last = price;
        }
    }
}

#[test]
fn test_basefee_never_drops_with_more_excess() {
    let config = config();
    let start = MAX_GAS_EXCESS / 2;
    let (mut last, _) = compute_basefee(&ExpCurve, &config, start, 0, 0).unwrap();
    for excess in start + 1..start + 1_000 {
        let (basefee, _) = compute_basefee(&ExpCurve, &config, excess, 0, 0).unwrap();
        assert!(basefee >= last, "basefee dropped at excess {excess}");
        last = basefee;
    }
}

#[test]
fn test_idle_chain_drains_excess_to_floor() {
    let (basefee, excess) = compute_basefee(&ExpCurve, &config(), 0, 1_000, 0).unwrap();
    assert_eq!(excess, 0);
    assert_eq!(basefee, 1);

    let (_, excess) = compute_basefee(&ExpCurve, &config(), 1_000_000, 1, 0).unwrap();
    assert_eq!(excess, 0);
}

#[test]
fn test_basefee_grows_with_gas_used() {
    let config = config();
    let mut last = 0;
    for used in [0u32, 10_000_000, 30_000_000, 60_000_000, 120_000_000] {
        let (basefee, _) =
            compute_basefee(&ExpCurve, &config, MAX_GAS_EXCESS / 2, 12, used).unwrap();
        assert!(basefee >= last, "basefee dropped at {used} gas");
        last = basefee;
    }
}

#[test]
fn test_basefee_and_excess_saturate() {
    let config = Eip1559Config { xscale: 1, yscale: 1, gas_issued_per_second: 1 };

    let (basefee, excess) =
        compute_basefee(&FlatCurve(U256::MAX), &config, u64::MAX, 0, u32::MAX).unwrap();
    assert_eq!(basefee, u64::MAX);
    assert_eq!(excess, u64::MAX);

    let (basefee, _) = compute_basefee(&FlatCurve(U256::ZERO), &config, 0, 0, 0).unwrap();
    assert_eq!(basefee, 1);
}

#[test]
fn test_huge_issuance_does_not_overflow() {
    let config = Eip1559Config { xscale: 1, yscale: 1, gas_issued_per_second: u64::MAX };
    let (_, excess) =
        compute_basefee(&FlatCurve(U256::from(7u64)), &config, u64::MAX, u64::MAX, u32::MAX)
            .unwrap();
    assert_eq!(excess, 0);
}

#[test]
fn test_out_of_range_excess_surfaces_curve_error() {
    let err = compute_basefee(&ExpCurve, &config(), u64::MAX, 0, 0).unwrap_err();
    assert_eq!(err, FeeMarketError::Curve(CurveError::OutOfStock));
}
