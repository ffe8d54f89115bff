//! Share accounting for lender positions
//!
//! Lenders hold shares of `total_assets`. Interest raises `total_assets`
//! without minting, so every share is worth more after accrual.

use odra::casper_types::U256;
use super::errors::CreditError;
use crate::math::SafeMath;

/// Shares minted for a deposit
///
/// Formula: shares = (amount * total_shares) / total_assets, rounded down.
/// If total_shares == 0, returns amount (1:1 initial rate)
pub fn shares_for_deposit(
    amount: U256,
    total_assets: U256,
    total_shares: U256,
) -> Result<U256, CreditError> {
    if amount.is_zero() {
        return Err(CreditError::ZeroAmount);
    }
    if total_shares.is_zero() {
        return Ok(amount);
    }
    let shares = SafeMath::mul_div_down(amount, total_shares, total_assets)?;
    if shares.is_zero() {
        // Less than one share's worth of assets
        return Err(CreditError::ZeroAmount);
    }
    Ok(shares)
}

/// Assets paid out for burning shares
///
/// Formula: payout = (shares * total_assets) / total_shares, rounded down
pub fn assets_for_shares(
    shares: U256,
    total_assets: U256,
    total_shares: U256,
) -> Result<U256, CreditError> {
    if shares.is_zero() {
        return Err(CreditError::ZeroAmount);
    }
    if shares > total_shares {
        return Err(CreditError::InsufficientShares);
    }
    SafeMath::mul_div_down(shares, total_assets, total_shares)
}
