//! # Decimal Normalization
//!
//! Converts amounts between decimal scales so that the bank cap can be
//! accounted in one canonical unit across assets of differing precision.
//!
//! Scaling down truncates toward zero. That is lossy on purpose: it matches
//! the accounting the ledger has always done, and it means the running total
//! drifts slightly below the exact sum over many small deposits. Scaling up
//! is exact but can overflow, which is reported instead of wrapping.
//!
//! There is no true inverse. Withdrawals re-apply [`to_canonical`] to the
//! withdrawn native amount so that depositing and withdrawing the same `x`
//! moves the total by the same value; [`from_canonical`] only exists for
//! reporting canonical figures back in an asset's own units.

use thiserror::Error;

use crate::config::CANONICAL_DECIMALS;

/// Errors produced by decimal scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// Scaling up would exceed `u128::MAX`.
    #[error("normalization overflow: {amount} scaled from {from} to {to} decimals")]
    Overflow {
        /// The amount being scaled.
        amount: u128,
        /// Source precision.
        from: u8,
        /// Target precision.
        to: u8,
    },
}

/// Rescales `amount` from `from` decimals to `to` decimals.
///
/// # Errors
///
/// Returns [`NormalizeError::Overflow`] when scaling up does not fit in
/// `u128`.
pub fn normalize(amount: u128, from: u8, to: u8) -> Result<u128, NormalizeError> {
    match from.cmp(&to) {
        std::cmp::Ordering::Equal => Ok(amount),
        std::cmp::Ordering::Greater => {
            // 10^39 > u128::MAX, so any divisor that does not fit truncates to zero.
            match 10u128.checked_pow(u32::from(from - to)) {
                Some(divisor) => Ok(amount / divisor),
                None => Ok(0),
            }
        }
        std::cmp::Ordering::Less => {
            let overflow = NormalizeError::Overflow { amount, from, to };
            if amount == 0 {
                return Ok(0);
            }
            let factor = 10u128.checked_pow(u32::from(to - from)).ok_or(overflow)?;
            amount.checked_mul(factor).ok_or(overflow)
        }
    }
}

/// Whether amounts at `decimals` precision can be converted to and from
/// canonical units with a scale factor that fits in `u128`.
pub fn supports_precision(decimals: u8) -> bool {
    10u128
        .checked_pow(u32::from(decimals.abs_diff(CANONICAL_DECIMALS)))
        .is_some()
}

/// Scales an amount in `decimals` precision to canonical units.
pub fn to_canonical(amount: u128, decimals: u8) -> Result<u128, NormalizeError> {
    normalize(amount, decimals, CANONICAL_DECIMALS)
}

/// Scales a canonical amount back to `decimals` precision.
///
/// Uses the same truncating path as [`to_canonical`], so
/// `to_canonical(from_canonical(x, d), d) == x` only holds when `d` is at
/// least the canonical precision.
pub fn from_canonical(amount: u128, decimals: u8) -> Result<u128, NormalizeError> {
    normalize(amount, CANONICAL_DECIMALS, decimals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NATIVE_DECIMALS;

    #[test]
    fn identity_when_precision_matches() {
        assert_eq!(normalize(123_456, 6, 6), Ok(123_456));
    }

    #[test]
    fn scales_down_with_truncation() {
        // 1.999999999999999999 ETH -> 1.999999 in six decimals.
        assert_eq!(normalize(1_999_999_999_999_999_999, 18, 6), Ok(1_999_999));
        // Anything below 10^12 wei vanishes.
        assert_eq!(normalize(999_999_999_999, 18, 6), Ok(0));
    }

    #[test]
    fn precision_support_follows_scale_factor() {
        assert!(supports_precision(0));
        assert!(supports_precision(NATIVE_DECIMALS));
        assert!(supports_precision(CANONICAL_DECIMALS + 38));
        assert!(!supports_precision(CANONICAL_DECIMALS + 39));
        assert!(!supports_precision(u8::MAX));
    }

    #[test]
    fn scales_up_exactly() {
        assert_eq!(normalize(5, 2, 6), Ok(50_000));
        assert_eq!(normalize(0, 0, 38), Ok(0));
    }

    #[test]
    fn scale_up_overflow_is_reported() {
        let err = normalize(u128::MAX, 0, 6).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::Overflow {
                amount: u128::MAX,
                from: 0,
                to: 6
            }
        );
        // 10^40 does not fit at all.
        assert!(normalize(1, 0, 40).is_err());
    }

    #[test]
    fn huge_divisor_truncates_to_zero() {
        assert_eq!(normalize(u128::MAX, 60, 6), Ok(0));
    }

    #[test]
    fn native_to_canonical() {
        let one_eth = 10u128.pow(18);
        assert_eq!(to_canonical(one_eth, NATIVE_DECIMALS), Ok(1_000_000));
        assert_eq!(from_canonical(1_000_000, NATIVE_DECIMALS), Ok(one_eth));
    }

    #[test]
    fn deposit_and_withdraw_move_total_symmetrically() {
        let x = 1_234_567_890_123_456_789u128;
        let credited = to_canonical(x, NATIVE_DECIMALS).unwrap();
        let debited = to_canonical(x, NATIVE_DECIMALS).unwrap();
        assert_eq!(credited, debited);
        assert_eq!(credited, 1_234_567);
    }

    #[test]
    fn low_precision_assets_roundtrip() {
        let canonical = to_canonical(250, 2).unwrap();
        assert_eq!(canonical, 2_500_000);
        assert_eq!(from_canonical(canonical, 2), Ok(250));
    }
}
