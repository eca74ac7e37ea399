//! Exponential bonding curve used to price gas.
//!
//! The curve is `Y(x) = e^(x * xscale)` in WAD (1e18) fixed point. Buying `p` units of gas
//! at excess `x` costs `(Y(x + p) - Y(x)) / yscale`, so the per-unit price is that amount
//! divided by `p`. Prices are monotonically non-decreasing in `x`.
//!
//! ```text
//! price(x, p) = (Y(x + p) - Y(x)) / yscale / p        with p = max(p, 1)
//! Y(x)        = exp_wad(x * xscale)                   for x * xscale < MAX_EXP_INPUT
//! ```

use alloy_primitives::{uint, U256};
use thiserror::Error;

/// 1.0 in WAD fixed point.
pub const WAD: U256 = uint!(1000000000000000000_U256);

/// Exclusive upper bound (WAD) on the exponent [`exp_wad`] accepts.
pub const MAX_EXP_INPUT: U256 = uint!(135305999368893231588_U256);

/// 1.0 at the 36-decimal precision the series runs at.
const ONE_E36: U256 = uint!(1000000000000000000000000000000000000_U256);

/// ln(2) at 36 decimals, rounded down.
const LN2_E36: U256 = uint!(693147180559945309417232121458176568_U256);

/// 5^18, the odd factor of `WAD`.
const FIVE_POW_18: U256 = uint!(3814697265625_U256);

/// Errors raised by a price curve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurveError {
    /// The scaled excess is beyond the range the curve can represent.
    #[error("curve out of stock: scaled excess exceeds the exponent limit")]
    OutOfStock,
    /// `xscale` or `yscale` is zero.
    #[error("curve scale is zero")]
    ZeroScale,
}

/// Price curve collaborator consumed by the fee market.
///
/// Implementations must be monotonically non-decreasing in `x_excess`.
pub trait PriceCurve {
    /// Per-unit price of buying `x_purchase` units (0 is treated as 1) at `x_excess`.
    fn price(
        &self,
        xscale: u128,
        yscale: u128,
        x_excess: u64,
        x_purchase: u64,
    ) -> Result<U256, CurveError>;
}

/// The default exponential curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpCurve;

impl ExpCurve {
    #[inline]
    fn y(x: U256, xscale: u128) -> Result<U256, CurveError> {
        exp_wad(x * U256::from(xscale))
    }
}

impl PriceCurve for ExpCurve {
    fn price(
        &self,
        xscale: u128,
        yscale: u128,
        x_excess: u64,
        x_purchase: u64,
    ) -> Result<U256, CurveError> {
        if xscale == 0 || yscale == 0 {
            return Err(CurveError::ZeroScale);
        }
        let purchase = U256::from(x_purchase.max(1));
        let excess = U256::from(x_excess);

        let before = Self::y(excess, xscale)?;
        let after = Self::y(excess + purchase, xscale)?;

        Ok((after - before) / U256::from(yscale) / purchase)
    }
}

/// `e^(x / 1e18) * 1e18`, rounded down, for `0 <= x < MAX_EXP_INPUT`. Results stay below
/// 2^256.
///
/// Range reduction `e^x = 2^k * e^r` with `k = floor(x / ln 2)` and `r in [0, ln 2)`,
/// then a Taylor series for `e^r` that stops at the first zero term. Both run at 36
/// decimals and the result is truncated once, after scaling by `2^k`, so the relative
/// error stays near 1e-34. Adjacent prices are differences of neighbouring values, and
/// that error sits far below the curve's convexity at any realistic `xscale`.
pub fn exp_wad(x: U256) -> Result<U256, CurveError> {
    if x >= MAX_EXP_INPUT {
        return Err(CurveError::OutOfStock);
    }

    let x = x * WAD;
    let k = x / LN2_E36;
    let r = x - k * LN2_E36;

    let mut sum = ONE_E36;
    let mut term = ONE_E36;
    let mut i = 1u64;
    while !term.is_zero() {
        term = term * r / (U256::from(i) * ONE_E36);
        sum += term;
        i += 1;
    }

    // x < MAX_EXP_INPUT bounds k below 196
    let k = k.as_limbs()[0] as usize;
    if k < 18 {
        return Ok((sum << k) / WAD);
    }

    // sum * 2^k / (2^18 * 5^18), split so no intermediate exceeds the result
    let shift = k - 18;
    let (quotient, remainder) = sum.div_rem(FIVE_POW_18);
    let high = quotient.checked_shl(shift).ok_or(CurveError::OutOfStock)?;
    let low = (remainder << shift) / FIVE_POW_18;
    high.checked_add(low).ok_or(CurveError::OutOfStock)
}
