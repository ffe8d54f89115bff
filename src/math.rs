//! Fixed-point utilities for the credit pool
//! Implements checked math and WAD/RAY scaled multiplication with explicit rounding
use odra::casper_types::U256;
use crate::credit::errors::CreditError;

/// 1.0 in WAD precision (1e18)
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// 1.0 in RAY precision (1e27), used for the borrow index
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Basis point denominator
pub const BPS_DENOMINATOR: u32 = 10_000;

/// 365 days
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// WAD as U256
pub fn wad() -> U256 {
    U256::from(WAD)
}

/// RAY as U256
pub fn ray() -> U256 {
    U256::from(RAY)
}

/// Checked math operations for U256
pub struct SafeMath;

impl SafeMath {
    /// Addition with overflow check
    pub fn add(a: U256, b: U256) -> Result<U256, CreditError> {
        a.checked_add(b).ok_or(CreditError::ArithmeticOverflow)
    }

    /// Subtraction with underflow check
    pub fn sub(a: U256, b: U256) -> Result<U256, CreditError> {
        a.checked_sub(b).ok_or(CreditError::ArithmeticOverflow)
    }

    /// Multiplication with overflow check
    pub fn mul(a: U256, b: U256) -> Result<U256, CreditError> {
        a.checked_mul(b).ok_or(CreditError::ArithmeticOverflow)
    }

    /// Division rounding down, zero divisor is an error
    pub fn div(a: U256, b: U256) -> Result<U256, CreditError> {
        if b.is_zero() {
            return Err(CreditError::ArithmeticOverflow);
        }
        Ok(a / b)
    }

    /// `a * b / c` rounded down
    pub fn mul_div_down(a: U256, b: U256, c: U256) -> Result<U256, CreditError> {
        Self::div(Self::mul(a, b)?, c)
    }

    /// `a * b / c` rounded up
    ///
    /// Used for anything owed to the protocol or added to a borrower's debt.
    pub fn mul_div_up(a: U256, b: U256, c: U256) -> Result<U256, CreditError> {
        if c.is_zero() {
            return Err(CreditError::ArithmeticOverflow);
        }
        let product = Self::mul(a, b)?;
        let quotient = product / c;
        if (product % c).is_zero() {
            Ok(quotient)
        } else {
            Self::add(quotient, U256::one())
        }
    }

    /// `a * b / WAD` rounded down
    pub fn wad_mul_down(a: U256, b: U256) -> Result<U256, CreditError> {
        Self::mul_div_down(a, b, wad())
    }

    /// `a * WAD / b` rounded down
    pub fn wad_div_down(a: U256, b: U256) -> Result<U256, CreditError> {
        Self::mul_div_down(a, wad(), b)
    }

    /// Returns the minimum of two U256 values
    pub fn min(a: U256, b: U256) -> U256 {
        if a < b { a } else { b }
    }

    /// Returns the maximum of two U256 values
    pub fn max(a: U256, b: U256) -> U256 {
        if a > b { a } else { b }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_rounding() {
        let a = U256::from(10);
        let b = U256::from(10);
        let c = U256::from(3);

        assert_eq!(SafeMath::mul_div_down(a, b, c).unwrap(), U256::from(33));
        assert_eq!(SafeMath::mul_div_up(a, b, c).unwrap(), U256::from(34));

        // Exact division does not round up
        assert_eq!(SafeMath::mul_div_up(a, b, U256::from(4)).unwrap(), U256::from(25));
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert_eq!(
            SafeMath::div(U256::one(), U256::zero()),
            Err(CreditError::ArithmeticOverflow)
        );
        assert_eq!(
            SafeMath::mul_div_up(U256::one(), U256::one(), U256::zero()),
            Err(CreditError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_overflow_is_never_wrapped() {
        assert_eq!(
            SafeMath::add(U256::MAX, U256::one()),
            Err(CreditError::ArithmeticOverflow)
        );
        assert_eq!(
            SafeMath::mul(U256::MAX, U256::from(2)),
            Err(CreditError::ArithmeticOverflow)
        );
        assert_eq!(
            SafeMath::sub(U256::zero(), U256::one()),
            Err(CreditError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_wad_helpers() {
        let half = U256::from(WAD / 2);
        assert_eq!(SafeMath::wad_mul_down(U256::from(1000), half).unwrap(), U256::from(500));
        assert_eq!(SafeMath::wad_div_down(U256::from(400), U256::from(1000)).unwrap(), U256::from(WAD / 10 * 4));
    }
}
