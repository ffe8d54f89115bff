//! Accrual Engine - time-driven interest shared by all borrowers
//!
//! Interest is charged on the pool's total debt and recorded in a single
//! global borrow index. Each borrower account snapshots the index when it is
//! touched and scales its debt by `index_now / index_snapshot` at read time,
//! so accrual never iterates over borrowers.

use odra::prelude::*;
use odra::casper_types::U256;
use super::errors::CreditError;
use super::rate_model::{self, PoolParams};
use crate::math::{ray, wad, SafeMath, BPS_DENOMINATOR, SECONDS_PER_YEAR};

/// Result of an accrual step
#[odra::odra_type]
pub struct AccrualReport {
    /// Annual rate applied over the elapsed period (scaled by 1e18)
    pub rate: U256,
    /// Interest added to borrower debt
    pub interest: U256,
    /// Part of `interest` credited to the reserve fund
    pub reserve_cut: U256,
    /// Borrow index after the step (scaled by 1e27)
    pub borrow_index: U256,
    /// Seconds covered by the step
    pub elapsed: u64,
}

/// In-memory copy of the pool ledger
///
/// Loaded from contract storage, advanced by `accrue` and the pool
/// operations, then written back in one place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolState {
    /// Undeployed liquidity
    pub cash: U256,
    /// Sum of borrower principal
    pub total_principal: U256,
    /// Interest owed by borrowers and not yet repaid
    pub accrued_interest: U256,
    /// Sum of lender shares
    pub total_shares: U256,
    /// Protocol-retained interest, excluded from lender assets
    pub reserve_balance: U256,
    /// Cumulative borrow index (scaled by 1e27)
    pub borrow_index: U256,
    /// Unix seconds of the last accrual
    pub last_accrual_time: u64,
}

impl PoolState {
    /// Empty pool created at `now`
    pub fn genesis(now: u64) -> Self {
        Self {
            cash: U256::zero(),
            total_principal: U256::zero(),
            accrued_interest: U256::zero(),
            total_shares: U256::zero(),
            reserve_balance: U256::zero(),
            borrow_index: ray(),
            last_accrual_time: now,
        }
    }

    /// Principal plus outstanding interest
    pub fn total_debt(&self) -> Result<U256, CreditError> {
        SafeMath::add(self.total_principal, self.accrued_interest)
    }

    /// Assets owned by lenders: cash + debt - reserve
    pub fn total_assets(&self) -> Result<U256, CreditError> {
        let gross = SafeMath::add(self.cash, self.total_debt()?)?;
        SafeMath::sub(gross, self.reserve_balance)
    }

    /// Current utilization (scaled by 1e18)
    pub fn utilization(&self) -> Result<U256, CreditError> {
        rate_model::utilization(self.cash, self.total_debt()?)
    }

    /// Current annual borrow rate (scaled by 1e18)
    pub fn current_rate(&self, params: &PoolParams) -> Result<U256, CreditError> {
        rate_model::borrow_rate(params, self.utilization()?)
    }

    /// Value of one share in assets (scaled by 1e18), 1.0 for an empty pool
    pub fn share_price(&self) -> Result<U256, CreditError> {
        if self.total_shares.is_zero() {
            return Ok(wad());
        }
        SafeMath::wad_div_down(self.total_assets()?, self.total_shares)
    }

    /// With no shares outstanding nothing can belong to lenders, so any
    /// residual assets are moved into the reserve.
    pub fn sweep_orphaned_assets(&mut self) -> Result<(), CreditError> {
        if self.total_shares.is_zero() {
            let orphaned = self.total_assets()?;
            if !orphaned.is_zero() {
                self.reserve_balance = SafeMath::add(self.reserve_balance, orphaned)?;
            }
        }
        Ok(())
    }
}

/// Advance the pool to `now`
///
/// Formula:
/// interest = ceil(total_debt * rate * elapsed / (1e18 * SECONDS_PER_YEAR))
/// reserve_cut = ceil(interest * reserve_bps / 10000)
/// borrow_index += ceil(borrow_index * interest / total_debt)
///
/// A zero elapsed time returns the state unchanged.
pub fn accrue(
    state: &PoolState,
    params: &PoolParams,
    now: u64,
) -> Result<(PoolState, AccrualReport), CreditError> {
    let rate = state.current_rate(params)?;
    let mut next = state.clone();
    let mut report = AccrualReport {
        rate,
        interest: U256::zero(),
        reserve_cut: U256::zero(),
        borrow_index: state.borrow_index,
        elapsed: 0,
    };

    if now <= state.last_accrual_time {
        return Ok((next, report));
    }
    let elapsed = now - state.last_accrual_time;
    next.last_accrual_time = now;
    report.elapsed = elapsed;

    let total_debt = state.total_debt()?;
    if total_debt.is_zero() || rate.is_zero() {
        return Ok((next, report));
    }

    let rate_time = SafeMath::mul(rate, U256::from(elapsed))?;
    let year = SafeMath::mul(wad(), U256::from(SECONDS_PER_YEAR))?;
    let interest = SafeMath::mul_div_up(total_debt, rate_time, year)?;

    // Without lenders the reserve takes the whole increment
    let reserve_cut = if state.total_shares.is_zero() {
        interest
    } else {
        SafeMath::mul_div_up(
            interest,
            U256::from(params.reserve_bps),
            U256::from(BPS_DENOMINATOR),
        )?
    };

    let index_delta = SafeMath::mul_div_up(state.borrow_index, interest, total_debt)?;

    next.accrued_interest = SafeMath::add(state.accrued_interest, interest)?;
    next.reserve_balance = SafeMath::add(state.reserve_balance, reserve_cut)?;
    next.borrow_index = SafeMath::add(state.borrow_index, index_delta)?;

    report.interest = interest;
    report.reserve_cut = reserve_cut;
    report.borrow_index = next.borrow_index;
    Ok((next, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::WAD;

    const DAY: u64 = 24 * 60 * 60;

    fn units(value: u128) -> U256 {
        U256::from(value * WAD)
    }

    fn lent_pool() -> PoolState {
        // 1000 deposited, 400 lent out
        PoolState {
            cash: units(600),
            total_principal: units(400),
            total_shares: units(1000),
            ..PoolState::genesis(0)
        }
    }

    #[test]
    fn test_zero_elapsed_is_noop() {
        let state = lent_pool();
        let params = PoolParams::defaults();

        let (next, report) = accrue(&state, &params, 0).unwrap();
        assert_eq!(next, state);
        assert!(report.interest.is_zero());

        // Second call at the same instant changes nothing either
        let (later, _) = accrue(&state, &params, 10).unwrap();
        let (again, report) = accrue(&later, &params, 10).unwrap();
        assert_eq!(again, later);
        assert!(report.interest.is_zero());
    }

    #[test]
    fn test_thirty_days_at_forty_percent_utilization() {
        let mut params = PoolParams::defaults();
        params.reserve_bps = 0;
        let state = lent_pool();

        let (next, report) = accrue(&state, &params, 30 * DAY).unwrap();

        // 400 * 6% * 30 / 365 = 1.9726...
        assert_eq!(report.rate, U256::from(60_000_000_000_000_000u128));
        let expected = U256::from(1_972_602_739_726_027_398u128);
        assert_eq!(report.interest, expected);
        assert_eq!(next.accrued_interest, expected);
        assert_eq!(next.last_accrual_time, 30 * DAY);
    }

    #[test]
    fn test_reserve_cut_and_lender_share() {
        let params = PoolParams::defaults();
        let state = lent_pool();
        let assets_before = state.total_assets().unwrap();

        let (next, report) = accrue(&state, &params, 365 * DAY).unwrap();

        // 10% of the interest is kept by the reserve, rounded up
        let expected_cut = SafeMath::mul_div_up(report.interest, U256::from(1000), U256::from(10_000)).unwrap();
        assert_eq!(report.reserve_cut, expected_cut);
        assert_eq!(next.reserve_balance, expected_cut);

        // Lenders gain the remainder without new shares
        let gained = next.total_assets().unwrap() - assets_before;
        assert_eq!(gained, report.interest - report.reserve_cut);
        assert_eq!(next.total_shares, state.total_shares);
    }

    #[test]
    fn test_borrow_index_tracks_total_debt() {
        let params = PoolParams::defaults();
        let state = lent_pool();

        let (next, report) = accrue(&state, &params, 90 * DAY).unwrap();

        // Debt scaled by the index growth matches the pool aggregate (index rounds up)
        let scaled = SafeMath::mul_div_up(state.total_debt().unwrap(), next.borrow_index, state.borrow_index).unwrap();
        let total = next.total_debt().unwrap();
        assert!(scaled >= total);
        assert!(scaled - total <= U256::one());
        assert_eq!(report.borrow_index, next.borrow_index);
    }

    #[test]
    fn test_empty_pool_only_moves_the_clock() {
        let params = PoolParams::defaults();
        let state = PoolState::genesis(5);

        let (next, report) = accrue(&state, &params, 500).unwrap();
        assert!(report.interest.is_zero());
        assert_eq!(report.rate, params.base_rate);
        assert_eq!(next.last_accrual_time, 500);
        assert_eq!(next.borrow_index, ray());
    }

    #[test]
    fn test_no_lenders_sends_interest_to_reserve() {
        let params = PoolParams::defaults();
        let state = PoolState {
            cash: units(10),
            total_principal: units(10),
            reserve_balance: units(20),
            ..PoolState::genesis(0)
        };
        assert!(state.total_assets().unwrap().is_zero());

        let (next, report) = accrue(&state, &params, 30 * DAY).unwrap();
        assert_eq!(report.reserve_cut, report.interest);
        assert!(next.total_assets().unwrap().is_zero());
    }

    #[test]
    fn test_sweep_orphaned_assets() {
        let mut state = PoolState {
            cash: U256::from(7),
            ..PoolState::genesis(0)
        };
        state.sweep_orphaned_assets().unwrap();
        assert_eq!(state.reserve_balance, U256::from(7));
        assert!(state.total_assets().unwrap().is_zero());
    }
}
