//! Saturating narrowing helpers shared by the fee market and tokenomics.

use alloy_primitives::U256;

/// Narrow a 256-bit intermediate to `u64`, saturating at `u64::MAX`.
#[inline]
pub(crate) fn saturate_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Narrow a 256-bit intermediate to `u128`, or `None` if it does not fit.
#[inline]
pub(crate) fn narrow_u128(value: U256) -> Option<u128> {
    u128::try_from(value).ok()
}
