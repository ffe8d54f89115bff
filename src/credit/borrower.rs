//! Borrower Ledger - per-account debt on top of the global borrow index

use odra::prelude::*;
use odra::casper_types::U256;
use super::errors::CreditError;
use crate::math::SafeMath;

/// Lifecycle of a borrower account
#[odra::odra_type]
#[derive(Default)]
pub enum AccountStatus {
    #[default]
    NoDebt = 0,
    Active = 1,
    /// Past `due_at`, still inside the grace period. `is_defaulted` is set.
    Overdue = 2,
    /// Past `due_at + grace_period_seconds`
    Defaulted = 3,
}

/// Debt summary returned by `get_borrower_debt`
#[odra::odra_type]
pub struct BorrowerDebt {
    pub principal: U256,
    pub interest_due: U256,
    pub due_at: u64,
    pub is_defaulted: bool,
}

/// How a repayment was split
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepaymentSplit {
    pub interest_paid: U256,
    pub principal_paid: U256,
}

/// Borrower account stored by the pool
///
/// `interest_due` is current as of `index_snapshot`. Call `settle` with the
/// pool's borrow index before reading or changing the debt.
#[odra::odra_type]
pub struct BorrowerAccount {
    pub owner: Address,
    pub principal: U256,
    pub interest_due: U256,
    pub index_snapshot: U256,
    /// Unix seconds, zero while the account has no debt
    pub due_at: u64,
    /// Latched once `due_at` passes with debt outstanding
    pub is_defaulted: bool,
    /// Latched once `due_at + grace_period_seconds` passes
    pub grace_expired: bool,
}

impl BorrowerAccount {
    /// Fresh account with no debt
    pub fn new(owner: Address, borrow_index: U256) -> Self {
        Self {
            owner,
            principal: U256::zero(),
            interest_due: U256::zero(),
            index_snapshot: borrow_index,
            due_at: 0,
            is_defaulted: false,
            grace_expired: false,
        }
    }

    pub fn total_debt(&self) -> Result<U256, CreditError> {
        SafeMath::add(self.principal, self.interest_due)
    }

    pub fn has_debt(&self) -> bool {
        !self.principal.is_zero() || !self.interest_due.is_zero()
    }

    /// Bring `interest_due` up to `borrow_index`
    ///
    /// Formula: live_debt = ceil(debt * borrow_index / index_snapshot)
    /// The growth over the stored debt is added to `interest_due`.
    pub fn settle(&self, borrow_index: U256) -> Result<Self, CreditError> {
        let mut next = self.clone();
        next.index_snapshot = borrow_index;
        if !self.has_debt() || borrow_index <= self.index_snapshot {
            return Ok(next);
        }
        let debt = self.total_debt()?;
        let live = SafeMath::mul_div_up(debt, borrow_index, self.index_snapshot)?;
        let growth = SafeMath::sub(live, debt)?;
        next.interest_due = SafeMath::add(self.interest_due, growth)?;
        Ok(next)
    }

    /// True once `due_at` has passed with debt outstanding
    pub fn is_past_due(&self, now: u64) -> bool {
        self.has_debt() && (self.is_defaulted || now > self.due_at)
    }

    /// Status at `now`, derived from the stored latches and the due date
    pub fn status(&self, now: u64, grace_period_seconds: u64) -> AccountStatus {
        if !self.has_debt() {
            return AccountStatus::NoDebt;
        }
        let grace_deadline = self.due_at.saturating_add(grace_period_seconds);
        if self.grace_expired || now > grace_deadline {
            AccountStatus::Defaulted
        } else if self.is_past_due(now) {
            AccountStatus::Overdue
        } else {
            AccountStatus::Active
        }
    }

    /// Record the past-due and grace-expired flags observed at `now`
    pub fn latch_default(&mut self, now: u64, grace_period_seconds: u64) {
        if self.is_past_due(now) {
            self.is_defaulted = true;
        }
        if self.status(now, grace_period_seconds) == AccountStatus::Defaulted {
            self.grace_expired = true;
        }
    }

    /// Add a draw to a settled account
    ///
    /// The due date is only set when the draw opens a new debt cycle.
    pub fn apply_borrow(
        &self,
        amount: U256,
        now: u64,
        loan_duration_seconds: u64,
    ) -> Result<Self, CreditError> {
        let mut next = self.clone();
        if !self.has_debt() {
            next.due_at = now
                .checked_add(loan_duration_seconds)
                .ok_or(CreditError::ArithmeticOverflow)?;
            next.is_defaulted = false;
            next.grace_expired = false;
        }
        next.principal = SafeMath::add(self.principal, amount)?;
        Ok(next)
    }

    /// Apply a repayment to a settled account, interest first
    pub fn apply_repayment(&self, amount: U256) -> Result<(Self, RepaymentSplit), CreditError> {
        if amount > self.total_debt()? {
            return Err(CreditError::OverRepayment);
        }
        let interest_paid = SafeMath::min(amount, self.interest_due);
        let principal_paid = SafeMath::sub(amount, interest_paid)?;

        let mut next = self.clone();
        next.interest_due = SafeMath::sub(self.interest_due, interest_paid)?;
        next.principal = SafeMath::sub(self.principal, principal_paid)?;
        if !next.has_debt() {
            next.due_at = 0;
            next.is_defaulted = false;
            next.grace_expired = false;
        }
        Ok((next, RepaymentSplit { interest_paid, principal_paid }))
    }

    /// Summary for external reads
    pub fn debt(&self, now: u64) -> BorrowerDebt {
        BorrowerDebt {
            principal: self.principal,
            interest_due: self.interest_due,
            due_at: self.due_at,
            is_defaulted: self.is_past_due(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{ray, RAY};
    use odra::casper_types::account::AccountHash;

    const DAY: u64 = 24 * 60 * 60;

    fn owner() -> Address {
        Address::Account(AccountHash::new([7u8; 32]))
    }

    #[test]
    fn test_settle_scales_debt_by_index() {
        let account = BorrowerAccount::new(owner(), ray())
            .apply_borrow(U256::from(1000), 0, 30 * DAY)
            .unwrap();

        // Index grew by 1.5%
        let index = U256::from(RAY + RAY / 200 * 3);
        let settled = account.settle(index).unwrap();
        assert_eq!(settled.principal, U256::from(1000));
        assert_eq!(settled.interest_due, U256::from(15));
        assert_eq!(settled.index_snapshot, index);

        // Settling twice at the same index adds nothing
        assert_eq!(settled.settle(index).unwrap(), settled);
    }

    #[test]
    fn test_settle_rounds_up() {
        let account = BorrowerAccount::new(owner(), ray())
            .apply_borrow(U256::from(3), 0, DAY)
            .unwrap();
        let settled = account.settle(U256::from(RAY + 1)).unwrap();
        assert_eq!(settled.interest_due, U256::one());
    }

    #[test]
    fn test_due_date_is_not_extended() {
        let account = BorrowerAccount::new(owner(), ray())
            .apply_borrow(U256::from(100), 1_000, 30 * DAY)
            .unwrap();
        assert_eq!(account.due_at, 1_000 + 30 * DAY);

        let topped_up = account.apply_borrow(U256::from(50), 20 * DAY, 30 * DAY).unwrap();
        assert_eq!(topped_up.principal, U256::from(150));
        assert_eq!(topped_up.due_at, 1_000 + 30 * DAY);
    }

    #[test]
    fn test_interest_paid_before_principal() {
        let mut account = BorrowerAccount::new(owner(), ray())
            .apply_borrow(U256::from(200), 0, 30 * DAY)
            .unwrap();
        account.interest_due = U256::from(5);

        let (after, split) = account.apply_repayment(U256::from(3)).unwrap();
        assert_eq!(split.interest_paid, U256::from(3));
        assert!(split.principal_paid.is_zero());
        assert_eq!(after.interest_due, U256::from(2));
        assert_eq!(after.principal, U256::from(200));

        let (after, split) = after.apply_repayment(U256::from(52)).unwrap();
        assert_eq!(split.interest_paid, U256::from(2));
        assert_eq!(split.principal_paid, U256::from(50));
        assert_eq!(after.principal, U256::from(150));
    }

    #[test]
    fn test_full_repayment_clears_account() {
        let mut account = BorrowerAccount::new(owner(), ray())
            .apply_borrow(U256::from(200), 0, 30 * DAY)
            .unwrap();
        account.interest_due = U256::from(5);
        account.is_defaulted = true;
        account.grace_expired = true;

        assert_eq!(
            account.apply_repayment(U256::from(206)),
            Err(CreditError::OverRepayment)
        );

        let (cleared, _) = account.apply_repayment(U256::from(205)).unwrap();
        assert!(!cleared.has_debt());
        assert_eq!(cleared.due_at, 0);
        assert!(!cleared.is_defaulted);
        assert!(!cleared.grace_expired);
        assert_eq!(cleared.status(100 * DAY, 7 * DAY), AccountStatus::NoDebt);
    }

    #[test]
    fn test_status_transitions() {
        let grace = 7 * DAY;
        let fresh = BorrowerAccount::new(owner(), ray());
        assert_eq!(fresh.status(0, grace), AccountStatus::NoDebt);

        let mut account = fresh.apply_borrow(U256::from(10), 0, 30 * DAY).unwrap();
        assert_eq!(account.status(30 * DAY, grace), AccountStatus::Active);
        assert!(!account.debt(30 * DAY).is_defaulted);
        assert_eq!(account.status(30 * DAY + 1, grace), AccountStatus::Overdue);
        assert!(account.debt(30 * DAY + 1).is_defaulted);
        assert_eq!(account.status(37 * DAY, grace), AccountStatus::Overdue);
        assert_eq!(account.status(37 * DAY + 1, grace), AccountStatus::Defaulted);

        // Latched flags survive a later, longer grace period
        account.latch_default(37 * DAY + 1, grace);
        assert!(account.is_defaulted);
        assert!(account.grace_expired);
        assert_eq!(account.status(37 * DAY + 1, 30 * DAY), AccountStatus::Defaulted);
    }

    #[test]
    fn test_past_due_is_flagged_before_grace_ends() {
        let grace = 7 * DAY;
        let mut account = BorrowerAccount::new(owner(), ray())
            .apply_borrow(U256::from(10), 0, 30 * DAY)
            .unwrap();

        account.latch_default(31 * DAY, grace);
        assert!(account.is_defaulted);
        assert!(!account.grace_expired);
        assert_eq!(account.status(31 * DAY, grace), AccountStatus::Overdue);
        assert!(account.debt(31 * DAY).is_defaulted);
    }
}
