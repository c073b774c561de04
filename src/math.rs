//! Wide intermediate arithmetic for reward and share conversions.

// required for clippy
#![allow(clippy::assign_op_pattern)]
#![allow(clippy::ptr_offset_with_cast)]
#![allow(clippy::manual_range_contains)]

use crate::error::Error;
use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer used for `a * b / c` without intermediate overflow.
    pub struct U256(4);
}

impl U256 {
    /// Narrows to `u128`, failing if the value does not fit.
    pub fn try_to_u128(self) -> Result<u128, Error> {
        if self.bits() > 128 {
            return Err(Error::Overflow);
        }
        Ok(self.low_u128())
    }
}

/// Computes `floor(a * b / denominator)`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, Error> {
    if denominator == 0 {
        return Err(Error::DivisionByZero);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(Error::Overflow)?;
    (product / U256::from(denominator)).try_to_u128()
}

/// Checked `a * b` on `u128`.
pub fn checked_mul(a: u128, b: u128) -> Result<u128, Error> {
    a.checked_mul(b).ok_or(Error::Overflow)
}

/// Checked `a + b` on `u128`.
pub fn checked_add(a: u128, b: u128) -> Result<u128, Error> {
    a.checked_add(b).ok_or(Error::Overflow)
}

/// Checked `a - b` on `u128`.
pub fn checked_sub(a: u128, b: u128) -> Result<u128, Error> {
    a.checked_sub(b).ok_or(Error::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mul_div_wide_intermediate() {
        let big = u128::MAX / 3;
        assert_eq!(mul_div(big, 6, 6).unwrap(), big);
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX).unwrap(), u128::MAX);
        assert_eq!(mul_div(1, 1, 0), Err(Error::DivisionByZero));
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(Error::Overflow));
    }

    #[test]
    fn test_checked_sub_rejects_underflow() {
        assert_eq!(checked_sub(6, 5), Ok(1));
        assert_eq!(checked_sub(5, 5), Ok(0));
        assert_eq!(checked_sub(5, 6), Err(Error::Overflow));
    }

    proptest! {
        #[test]
        fn mul_div_floors(a in 0u128..u64::MAX as u128, b in 0u128..u64::MAX as u128, d in 1u128..u64::MAX as u128) {
            let expected = a * b / d;
            prop_assert_eq!(mul_div(a, b, d).unwrap(), expected);
        }
    }
}
