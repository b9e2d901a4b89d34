//! Deterministic fixed-point helpers for representing ratios without floats.
//!
//! Ratios are basis points (`BPS_SCALE = 10_000`) so that `1.0 == 10_000` and
//! `0.5 == 5_000`. All intermediate math is done in `u128` with checked
//! multiplication, which keeps results reproducible across hosts.

use crate::units::{Amount, BPS_SCALE};
use core::fmt;

/// Safe multiplication followed by division using a u128 intermediate.
/// Returns `None` if the divisor is zero or the product overflows.
#[inline]
pub fn mul_div(n: u128, mul: u128, div: u128) -> Option<u128> {
    if div == 0 {
        return None;
    }
    n.checked_mul(mul).map(|product| product / div)
}

/// Apply a basis-point fraction to an amount (`amount * bps / 10_000`).
///
/// Saturates instead of overflowing; amounts large enough to overflow are
/// outside any realistic supply.
#[inline]
pub fn apply_bps(amount: Amount, bps: u32) -> Amount {
    match amount.checked_mul(bps as u128) {
        Some(product) => product / BPS_SCALE as u128,
        None => (amount / BPS_SCALE as u128).saturating_mul(bps as u128),
    }
}

/// Compute a ratio in basis points from two integers, clamped to `[0, 10_000]`.
pub fn ratio_bps(numerator: u128, denominator: u128) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let scaled = numerator.saturating_mul(BPS_SCALE as u128) / denominator;
    scaled.min(BPS_SCALE as u128) as u32
}

/// Clamp a value into the inclusive range `[lo, hi]`.
#[inline]
pub fn clamp_u32(value: u32, lo: u32, hi: u32) -> u32 {
    value.max(lo).min(hi)
}

/// Format basis points as a multiplier string (`15_000 -> "1.5x"`).
pub fn format_multiplier(bps: u32) -> MultiplierDisplay {
    MultiplierDisplay { bps }
}

/// Display helper returned by [`format_multiplier`].
pub struct MultiplierDisplay {
    bps: u32,
}

impl fmt::Display for MultiplierDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.bps / BPS_SCALE;
        let fractional = self.bps % BPS_SCALE;

        if fractional == 0 {
            write!(f, "{}x", whole)
        } else {
            // Trim trailing zeros for cleaner formatting.
            let mut frac_str = format!("{fractional:04}");
            while frac_str.ends_with('0') {
                frac_str.pop();
            }
            write!(f, "{}.{}x", whole, frac_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div() {
        assert_eq!(mul_div(10, 3, 2), Some(15));
        assert_eq!(mul_div(10, 3, 0), None);
        assert_eq!(mul_div(u128::MAX, 2, 1), None);
    }

    #[test]
    fn test_apply_bps() {
        assert_eq!(apply_bps(1_000, 2_500), 250);
        assert_eq!(apply_bps(1_000, 10_000), 1_000);
        assert_eq!(apply_bps(0, 5_000), 0);
        assert_eq!(apply_bps(999, 1), 0);
    }

    #[test]
    fn test_ratio_bps() {
        assert_eq!(ratio_bps(1, 2), 5_000);
        assert_eq!(ratio_bps(3, 3), 10_000);
        assert_eq!(ratio_bps(5, 3), 10_000);
        assert_eq!(ratio_bps(5, 0), 0);
    }

    #[test]
    fn test_multiplier_display() {
        assert_eq!(format!("{}", format_multiplier(10_000)), "1x");
        assert_eq!(format!("{}", format_multiplier(15_000)), "1.5x");
        assert_eq!(format!("{}", format_multiplier(12_050)), "1.205x");
    }

    proptest::proptest! {
        #[test]
        fn apply_bps_never_exceeds_amount(amount in 0u128..=u64::MAX as u128, bps in 0u32..=10_000) {
            proptest::prop_assert!(apply_bps(amount, bps) <= amount);
        }

        #[test]
        fn ratio_bps_is_bounded(n in proptest::prelude::any::<u64>(), d in proptest::prelude::any::<u64>()) {
            proptest::prop_assert!(ratio_bps(n as u128, d as u128) <= 10_000);
        }
    }
}
