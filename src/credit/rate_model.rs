//! Interest Rate Model - kinked utilization curve
//!
//! Two linear segments joined at the kink:
//! - Below the kink the rate climbs from `base_rate` to `kink_rate`
//! - Above the kink it climbs from `kink_rate` to `max_rate` at 100% utilization
//!
//! Both segments are exact at their endpoints, so the curve is continuous at
//! the kink and non-decreasing over the whole domain.

use odra::prelude::*;
use odra::casper_types::U256;
use super::errors::CreditError;
use crate::math::{wad, SafeMath, WAD};

/// Upper bound for the reserve cut, in basis points
pub const MAX_RESERVE_BPS: u32 = 3_000;

/// Upper bound for any configured rate (1000% APR, scaled by 1e18)
pub const MAX_RATE_CEILING: u128 = 10 * WAD;

/// Pool parameters, set at deployment and by the admin
#[odra::odra_type]
pub struct PoolParams {
    /// Rate at zero utilization (annual, scaled by 1e18)
    /// Example: 2% = 0.02 * 1e18 = 20000000000000000
    pub base_rate: U256,

    /// Rate at the kink (annual, scaled by 1e18)
    pub kink_rate: U256,

    /// Rate at 100% utilization (annual, scaled by 1e18)
    pub max_rate: U256,

    /// Utilization where the slope changes (scaled by 1e18)
    /// Example: 80% = 0.80 * 1e18 = 800000000000000000
    pub kink_utilization: U256,

    /// Share of accrued interest kept by the reserve fund
    pub reserve_bps: u32,

    /// Seconds past `due_at` before an unpaid account counts as defaulted
    pub grace_period_seconds: u64,

    /// Loan term granted on the first draw of a debt cycle
    pub loan_duration_seconds: u64,
}

impl PoolParams {
    /// Deployment defaults: 2% base, 10% at an 80% kink, 50% max,
    /// 10% reserve cut, 30 day term, 7 day grace
    pub fn defaults() -> Self {
        Self {
            base_rate: U256::from(20_000_000_000_000_000u128),
            kink_rate: U256::from(100_000_000_000_000_000u128),
            max_rate: U256::from(500_000_000_000_000_000u128),
            kink_utilization: U256::from(800_000_000_000_000_000u128),
            reserve_bps: 1_000,
            grace_period_seconds: 7 * 24 * 60 * 60,
            loan_duration_seconds: 30 * 24 * 60 * 60,
        }
    }

    /// Bounds check applied by the pool before any parameter write
    pub fn validate(&self) -> Result<(), CreditError> {
        if self.kink_utilization.is_zero() || self.kink_utilization > wad() {
            return Err(CreditError::BadParams);
        }
        if self.base_rate > self.kink_rate || self.kink_rate > self.max_rate {
            return Err(CreditError::BadParams);
        }
        if self.max_rate > U256::from(MAX_RATE_CEILING) {
            return Err(CreditError::BadParams);
        }
        if self.reserve_bps > MAX_RESERVE_BPS {
            return Err(CreditError::BadParams);
        }
        if self.loan_duration_seconds == 0 {
            return Err(CreditError::BadParams);
        }
        Ok(())
    }
}

/// Calculate utilization rate
///
/// Formula: utilization = total_debt / (cash + total_debt)
///
/// # Returns
/// Utilization (scaled by 1e18), zero for an empty pool
pub fn utilization(cash: U256, total_debt: U256) -> Result<U256, CreditError> {
    if total_debt.is_zero() {
        return Ok(U256::zero());
    }
    let total = SafeMath::add(cash, total_debt)?;
    SafeMath::wad_div_down(total_debt, total)
}

/// Calculate the annual borrow rate for a utilization
///
/// Formula:
/// - If utilization <= kink:
///   rate = base_rate + (utilization / kink) * (kink_rate - base_rate)
/// - If utilization > kink:
///   rate = kink_rate + ((utilization - kink) / (1 - kink)) * (max_rate - kink_rate)
///
/// # Returns
/// Annual rate (scaled by 1e18)
pub fn borrow_rate(params: &PoolParams, utilization: U256) -> Result<U256, CreditError> {
    let kink = params.kink_utilization;
    let utilization = SafeMath::min(utilization, wad());

    if utilization <= kink {
        let slope = SafeMath::sub(params.kink_rate, params.base_rate)?;
        let increase = SafeMath::mul_div_down(utilization, slope, kink)?;
        SafeMath::add(params.base_rate, increase)
    } else {
        let excess = SafeMath::sub(utilization, kink)?;
        let span = SafeMath::sub(wad(), kink)?;
        let slope = SafeMath::sub(params.max_rate, params.kink_rate)?;
        let increase = SafeMath::mul_div_down(excess, slope, span)?;
        SafeMath::add(params.kink_rate, increase)
    }
}
