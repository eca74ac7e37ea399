//! EIP-1559 style fee market.
//!
//! Every block issues `gas_issued_per_second` of capacity per elapsed second; gas used
//! beyond that accumulates as "gas excess". The base fee is the price curve evaluated at
//! the current excess, so sustained demand above issuance pushes the fee up and idle time
//! brings it back down.
//!
//! ```text
//! issued         = time_since_parent * gas_issued_per_second
//! excess         = max(gas_excess + parent_gas_used, issued)
//! new_gas_excess = min(excess - issued, u64::MAX)
//! basefee        = max(min(curve.price(new_gas_excess, 0), u64::MAX), 1)
//! ```

mod curve;

use alloy_primitives::U256;
use thiserror::Error;

use crate::{config::Eip1559Config, math};

pub use curve::{exp_wad, CurveError, ExpCurve, PriceCurve, MAX_EXP_INPUT, WAD};

/// Errors from fee-market derivation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeMarketError {
    /// Curve derivation got a zero parameter or produced a degenerate scale.
    #[error("invalid EIP-1559 config: {0}")]
    InvalidConfig(String),
    /// The price curve rejected its inputs.
    #[error("price curve error: {0}")]
    Curve(#[from] CurveError),
}

/// Compute the base fee for the next block and the updated gas excess.
///
/// Returns `(basefee, new_gas_excess)`. When issuance is disabled the base fee is pinned to
/// 1 and the excess is returned unchanged.
pub fn compute_basefee<C: PriceCurve + ?Sized>(
    curve: &C,
    config: &Eip1559Config,
    gas_excess: u64,
    time_since_parent: u64,
    parent_gas_used: u32,
) -> Result<(u64, u64), FeeMarketError> {
    if config.is_disabled() {
        return Ok((1, gas_excess));
    }

    let issued = U256::from(time_since_parent) * U256::from(config.gas_issued_per_second);
    let excess = (U256::from(gas_excess) + U256::from(parent_gas_used)).max(issued);
    let new_gas_excess = math::saturate_u64(excess - issued);

    let price = curve.price(config.xscale, config.yscale, new_gas_excess, 0)?;
    let basefee = math::saturate_u64(price).max(1);

    Ok((basefee, new_gas_excess))
}

/// Derive `(xscale, yscale)` for a target base fee.
///
/// `xscale` maps `max_gas_excess` onto the curve's full exponent range. The curve is
/// anchored at half the max excess, where buying `gas_target` units costs `basefee` per
/// unit.
pub fn calc_scales<C: PriceCurve + ?Sized>(
    curve: &C,
    basefee: u64,
    max_gas_excess: u64,
    gas_target: u64,
) -> Result<(u128, u128), FeeMarketError> {
    if basefee == 0 || max_gas_excess == 0 || gas_target == 0 {
        return Err(FeeMarketError::InvalidConfig("zero parameter".into()));
    }

    let xscale = math::narrow_u128(MAX_EXP_INPUT / U256::from(max_gas_excess))
        .filter(|s| *s != 0)
        .ok_or_else(|| FeeMarketError::InvalidConfig("xscale is zero".into()))?;

    // Pricing with yscale = basefee yields (Y(x + t) - Y(x)) / basefee / t, which is the
    // divisor that makes the per-unit price at the anchor equal `basefee`.
    let anchor = max_gas_excess / 2;
    let yscale = curve.price(xscale, u128::from(basefee), anchor, gas_target)?;
    let yscale = math::narrow_u128(yscale)
        .filter(|s| *s != 0)
        .ok_or_else(|| FeeMarketError::InvalidConfig(format!("yscale out of range: {yscale}")))?;

    Ok((xscale, yscale))
}

/// Ratio, in basis points, between the per-unit price of buying `2 * gas_target` and
/// `gas_target` units at half the max excess.
pub fn realised_ratio_2x1x<C: PriceCurve + ?Sized>(
    curve: &C,
    xscale: u128,
    yscale: u128,
    max_gas_excess: u64,
    gas_target: u64,
) -> Result<u64, FeeMarketError> {
    let anchor = max_gas_excess / 2;
    let double_target = gas_target
        .checked_mul(2)
        .ok_or_else(|| FeeMarketError::InvalidConfig("gas target too large".into()))?;

    let price_1x = curve.price(xscale, yscale, anchor, gas_target)?;
    let price_2x = curve.price(xscale, yscale, anchor, double_target)?;
    if price_1x.is_zero() {
        return Err(FeeMarketError::InvalidConfig("price at gas target is zero".into()));
    }

    Ok(math::saturate_u64(price_2x * U256::from(10_000u64) / price_1x))
}

/// Derive the curve configuration for a chain.
///
/// Fails with [`FeeMarketError::InvalidConfig`] if any input is zero, if either scale
/// degenerates, or if the curve's realised 2x/1x price ratio (basis points) is not
/// `ratio_2x1x`.
pub fn calc_eip1559_config<C: PriceCurve + ?Sized>(
    curve: &C,
    basefee: u64,
    gas_issued_per_second: u64,
    max_gas_excess: u64,
    gas_target: u64,
    ratio_2x1x: u64,
) -> Result<Eip1559Config, FeeMarketError> {
    if gas_issued_per_second == 0 || ratio_2x1x == 0 {
        return Err(FeeMarketError::InvalidConfig("zero parameter".into()));
    }

    let (xscale, yscale) = calc_scales(curve, basefee, max_gas_excess, gas_target)?;

    let ratio = realised_ratio_2x1x(curve, xscale, yscale, max_gas_excess, gas_target)?;
    if ratio != ratio_2x1x {
        return Err(FeeMarketError::InvalidConfig(format!(
            "unexpected 2x/1x ratio: expected {ratio_2x1x}, got {ratio}"
        )));
    }

    tracing::debug!(
        target: "anchorex::fee_market",
        xscale,
        yscale,
        gas_issued_per_second,
        ratio,
        "derived EIP-1559 config"
    );

    Ok(Eip1559Config { xscale, yscale, gas_issued_per_second })
}
