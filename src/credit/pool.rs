//! Credit Pool - lender shares, attested borrowing and interest accrual
//!
//! Core contract of the protocol, coordinating:
//! - Stable asset deposits and withdrawals for pool shares
//! - Borrowing up to the limit registered in the `CreditRegistry`
//! - Repayments, interest first
//! - Interest accrual through a global borrow index
//!
//! Every mutating entry point loads the ledger into a `PoolState`, accrues it
//! to the current block time, validates, and only then writes it back.

use odra::prelude::*;
use odra::casper_types::U256;
use odra::ContractRef;
use super::accrual::{self, AccrualReport, PoolState};
use super::borrower::{AccountStatus, BorrowerAccount, BorrowerDebt};
use super::errors::CreditError;
use super::events::*;
use super::rate_model::PoolParams;
use super::registry::{CreditLine, CreditRegistryContractRef};
use super::shares::{assets_for_shares, shares_for_deposit};
use super::zero_address;
use crate::math::SafeMath;
use crate::token::Cep18TokenContractRef;

/// Credit Pool contract
#[odra::module(events = [
    Deposited,
    Withdrawn,
    Borrowed,
    Repaid,
    AccountCleared,
    InterestAccrued,
    ParamsUpdated,
    BorrowPauseSet,
    AdminSet
])]
pub struct CreditPool {
    /// Stable asset (CEP-18) address
    asset: Var<Address>,
    /// Credit registry address
    registry: Var<Address>,
    /// Admin address
    admin: Var<Address>,
    /// Rate curve, reserve cut and loan terms
    params: Var<PoolParams>,
    /// Blocks new borrows when set
    borrow_paused: Var<bool>,

    /// Undeployed liquidity
    cash: Var<U256>,
    /// Sum of borrower principal
    total_principal: Var<U256>,
    /// Interest owed by borrowers
    accrued_interest: Var<U256>,
    /// Sum of lender shares
    total_shares: Var<U256>,
    /// Protocol reserve, excluded from lender assets
    reserve_balance: Var<U256>,
    /// Cumulative borrow index (scaled by 1e27)
    borrow_index: Var<U256>,
    /// Unix seconds of the last accrual
    last_accrual_time: Var<u64>,

    /// Lender shares
    shares: Mapping<Address, U256>,
    /// Borrower accounts
    accounts: Mapping<Address, BorrowerAccount>,
}

#[odra::module]
impl CreditPool {
    /// Initialize the pool, the deployer becomes admin
    pub fn init(&mut self, asset: Address, registry: Address) {
        if asset == zero_address() || registry == zero_address() {
            self.env().revert(CreditError::ZeroAddress);
        }
        self.asset.set(asset);
        self.registry.set(registry);
        self.admin.set(self.env().caller());
        self.params.set(PoolParams::defaults());
        self.borrow_paused.set(false);
        self.store_state(&PoolState::genesis(self.now()));
    }

    // ========================================================================
    // Lender Functions
    // ========================================================================

    /// Deposit `amount` of the asset for pool shares
    ///
    /// # Returns
    /// Shares minted
    pub fn deposit(&mut self, amount: U256) -> U256 {
        if amount.is_zero() {
            self.env().revert(CreditError::ZeroAmount);
        }
        let caller = self.env().caller();
        let now = self.now();
        let (mut state, report) = self.accrued_state(now);

        let total_assets = self.ok_or_revert(state.total_assets());
        let minted = self.ok_or_revert(shares_for_deposit(amount, total_assets, state.total_shares));

        state.cash = self.ok_or_revert(SafeMath::add(state.cash, amount));
        state.total_shares = self.ok_or_revert(SafeMath::add(state.total_shares, minted));
        let lender_shares = self.ok_or_revert(SafeMath::add(self.shares_of(caller), minted));

        self.commit(state, &report, now);
        self.shares.set(&caller, lender_shares);

        let mut asset = Cep18TokenContractRef::new(self.env(), self.asset());
        asset.transfer_from(caller, self.env().self_address(), amount);

        self.env().emit_event(Deposited {
            lender: caller,
            amount,
            shares: minted,
            timestamp: now,
        });

        minted
    }

    /// Burn `shares` for their share of pool assets
    ///
    /// # Returns
    /// Asset amount paid out
    pub fn withdraw(&mut self, shares: U256) -> U256 {
        if shares.is_zero() {
            self.env().revert(CreditError::ZeroAmount);
        }
        let caller = self.env().caller();
        let lender_shares = self.shares_of(caller);
        if shares > lender_shares {
            self.env().revert(CreditError::InsufficientShares);
        }
        let now = self.now();
        let (mut state, report) = self.accrued_state(now);

        let total_assets = self.ok_or_revert(state.total_assets());
        let payout = self.ok_or_revert(assets_for_shares(shares, total_assets, state.total_shares));
        if payout > state.cash {
            self.env().revert(CreditError::InsufficientLiquidity);
        }

        state.cash = self.ok_or_revert(SafeMath::sub(state.cash, payout));
        state.total_shares = self.ok_or_revert(SafeMath::sub(state.total_shares, shares));

        self.commit(state, &report, now);
        self.shares.set(&caller, lender_shares - shares);

        if !payout.is_zero() {
            let mut asset = Cep18TokenContractRef::new(self.env(), self.asset());
            asset.transfer(caller, payout);
        }

        self.env().emit_event(Withdrawn {
            lender: caller,
            amount: payout,
            shares,
            timestamp: now,
        });

        payout
    }

    /// Assets `withdraw(shares)` would pay out now
    pub fn preview_withdraw(&self, shares: U256) -> U256 {
        let state = self.projected_state();
        let total_assets = self.ok_or_revert(state.total_assets());
        self.ok_or_revert(assets_for_shares(shares, total_assets, state.total_shares))
    }

    /// Shares `deposit(amount)` would mint now
    pub fn preview_deposit(&self, amount: U256) -> U256 {
        let state = self.projected_state();
        let total_assets = self.ok_or_revert(state.total_assets());
        self.ok_or_revert(shares_for_deposit(amount, total_assets, state.total_shares))
    }

    // ========================================================================
    // Borrower Functions
    // ========================================================================

    /// Draw `amount` against the caller's registered credit line
    ///
    /// # Returns
    /// Principal after the draw
    pub fn borrow(&mut self, amount: U256) -> U256 {
        if amount.is_zero() {
            self.env().revert(CreditError::ZeroAmount);
        }
        if self.is_borrow_paused() {
            self.env().revert(CreditError::BorrowPaused);
        }
        let caller = self.env().caller();
        let now = self.now();
        let params = self.get_params();
        let (mut state, report) = self.accrued_state(now);

        let line = self.registered_line(caller);
        if line.expiry <= now {
            self.env().revert(CreditError::LimitInvalid);
        }

        let mut account = self.settled_account(caller, state.borrow_index);
        account.latch_default(now, params.grace_period_seconds);
        if account.status(now, params.grace_period_seconds) == AccountStatus::Defaulted {
            self.env().revert(CreditError::AccountDefaulted);
        }

        let debt = self.ok_or_revert(account.total_debt());
        let available = line.limit.saturating_sub(debt);
        if amount > available {
            self.env().revert(CreditError::CreditExceeded);
        }
        if amount > state.cash {
            self.env().revert(CreditError::InsufficientLiquidity);
        }

        let account = self.ok_or_revert(account.apply_borrow(amount, now, params.loan_duration_seconds));
        state.cash = self.ok_or_revert(SafeMath::sub(state.cash, amount));
        state.total_principal = self.ok_or_revert(SafeMath::add(state.total_principal, amount));
        let borrow_rate = self.ok_or_revert(state.current_rate(&params));

        self.commit(state, &report, now);
        self.accounts.set(&caller, account.clone());

        let mut asset = Cep18TokenContractRef::new(self.env(), self.asset());
        asset.transfer(caller, amount);

        self.env().emit_event(Borrowed {
            borrower: caller,
            amount,
            principal: account.principal,
            due_at: account.due_at,
            borrow_rate,
            timestamp: now,
        });

        account.principal
    }

    /// Repay `amount` of the caller's debt, interest first
    ///
    /// # Returns
    /// Debt remaining on the account
    pub fn repay(&mut self, amount: U256) -> U256 {
        if amount.is_zero() {
            self.env().revert(CreditError::ZeroAmount);
        }
        let caller = self.env().caller();
        self.repay_internal(caller, Some(amount)).1
    }

    /// Repay the caller's whole live debt
    ///
    /// # Returns
    /// Amount paid
    pub fn repay_all(&mut self) -> U256 {
        let caller = self.env().caller();
        self.repay_internal(caller, None).0
    }

    /// Accrue interest up to the current block time
    pub fn accrue(&mut self) -> AccrualReport {
        let now = self.now();
        let (state, report) = self.accrued_state(now);
        self.commit(state, &report, now);
        report
    }

    // ========================================================================
    // Borrower Views
    // ========================================================================

    /// Debt of `user` accrued to now
    pub fn get_borrower_debt(&self, user: Address) -> BorrowerDebt {
        let account = self.projected_account(user);
        account.debt(self.now())
    }

    pub fn account_status(&self, user: Address) -> AccountStatus {
        let account = self.projected_account(user);
        account.status(self.now(), self.get_params().grace_period_seconds)
    }

    pub fn is_in_default(&self, user: Address) -> bool {
        self.account_status(user) == AccountStatus::Defaulted
    }

    /// Principal plus interest of `user` accrued to now
    pub fn user_total_debt(&self, user: Address) -> U256 {
        let account = self.projected_account(user);
        self.ok_or_revert(account.total_debt())
    }

    /// Attested limit minus current debt, zero without a valid line
    pub fn available_credit(&self, user: Address) -> U256 {
        let line = self.registered_line(user);
        if line.expiry <= self.now() {
            return U256::zero();
        }
        line.limit.saturating_sub(self.user_total_debt(user))
    }

    pub fn shares_of(&self, owner: Address) -> U256 {
        self.shares.get(&owner).unwrap_or_default()
    }

    // ========================================================================
    // Pool Views
    // ========================================================================

    pub fn total_shares(&self) -> U256 {
        self.total_shares.get_or_default()
    }

    pub fn cash(&self) -> U256 {
        self.cash.get_or_default()
    }

    pub fn total_principal(&self) -> U256 {
        self.total_principal.get_or_default()
    }

    /// Outstanding interest accrued to now
    pub fn accrued_interest(&self) -> U256 {
        self.projected_state().accrued_interest
    }

    pub fn total_debt(&self) -> U256 {
        self.ok_or_revert(self.projected_state().total_debt())
    }

    /// Lender-owned assets accrued to now
    pub fn total_assets(&self) -> U256 {
        self.ok_or_revert(self.projected_state().total_assets())
    }

    pub fn reserve_balance(&self) -> U256 {
        self.projected_state().reserve_balance
    }

    pub fn utilization(&self) -> U256 {
        self.ok_or_revert(self.projected_state().utilization())
    }

    /// Annual borrow rate at the current utilization (scaled by 1e18)
    pub fn current_rate(&self) -> U256 {
        let params = self.get_params();
        self.ok_or_revert(self.projected_state().current_rate(&params))
    }

    pub fn borrow_index(&self) -> U256 {
        self.projected_state().borrow_index
    }

    /// Time of the last stored accrual
    pub fn last_accrual_time(&self) -> u64 {
        self.last_accrual_time.get_or_default()
    }

    pub fn get_params(&self) -> PoolParams {
        self.params.get_or_revert_with(CreditError::BadParams)
    }

    pub fn admin(&self) -> Address {
        self.admin.get_or_revert_with(CreditError::NotAuthorized)
    }

    pub fn asset(&self) -> Address {
        self.asset.get_or_revert_with(CreditError::ZeroAddress)
    }

    pub fn registry(&self) -> Address {
        self.registry.get_or_revert_with(CreditError::ZeroAddress)
    }

    pub fn is_borrow_paused(&self) -> bool {
        self.borrow_paused.get_or_default()
    }

    // ========================================================================
    // Admin Functions
    // ========================================================================

    /// Replace the pool parameters
    ///
    /// Interest up to now accrues under the previous parameters.
    pub fn set_params(
        &mut self,
        base_rate: U256,
        kink_rate: U256,
        kink_utilization: U256,
        max_rate: U256,
        reserve_bps: u32,
        grace_period_seconds: u64,
        loan_duration_seconds: u64,
    ) {
        self.only_admin();
        let params = PoolParams {
            base_rate,
            kink_rate,
            max_rate,
            kink_utilization,
            reserve_bps,
            grace_period_seconds,
            loan_duration_seconds,
        };
        self.ok_or_revert(params.validate());

        let now = self.now();
        let (state, report) = self.accrued_state(now);
        self.commit(state, &report, now);
        self.params.set(params);

        self.env().emit_event(ParamsUpdated {
            base_rate,
            kink_rate,
            max_rate,
            kink_utilization,
            reserve_bps,
            grace_period_seconds,
            loan_duration_seconds,
            timestamp: now,
        });
    }

    pub fn set_admin(&mut self, admin: Address) {
        self.only_admin();
        if admin == zero_address() {
            self.env().revert(CreditError::ZeroAddress);
        }
        let previous = self.admin();
        self.admin.set(admin);

        self.env().emit_event(AdminSet {
            previous,
            admin,
            timestamp: self.now(),
        });
    }

    /// Pause or resume new borrows; deposits, withdrawals and repayments stay open
    pub fn set_borrow_paused(&mut self, paused: bool) {
        self.only_admin();
        self.borrow_paused.set(paused);

        self.env().emit_event(BorrowPauseSet {
            paused,
            timestamp: self.now(),
        });
    }
}

impl CreditPool {
    /// Shared repayment path; `None` repays the whole live debt
    ///
    /// Returns (amount paid, remaining debt)
    fn repay_internal(&mut self, caller: Address, amount: Option<U256>) -> (U256, U256) {
        let now = self.now();
        let params = self.get_params();
        let (mut state, report) = self.accrued_state(now);

        let mut account = self.settled_account(caller, state.borrow_index);
        account.latch_default(now, params.grace_period_seconds);
        let amount = match amount {
            Some(amount) => amount,
            None => self.ok_or_revert(account.total_debt()),
        };
        if amount.is_zero() {
            self.env().revert(CreditError::ZeroAmount);
        }
        let (account, split) = self.ok_or_revert(account.apply_repayment(amount));

        state.cash = self.ok_or_revert(SafeMath::add(state.cash, amount));
        state.total_principal = self.ok_or_revert(SafeMath::sub(state.total_principal, split.principal_paid));
        // Per-account rounding can exceed the pool aggregate by dust
        state.accrued_interest = state.accrued_interest.saturating_sub(split.interest_paid);
        let remaining = self.ok_or_revert(account.total_debt());
        let cleared = !account.has_debt();

        self.commit(state, &report, now);
        self.accounts.set(&caller, account);

        let mut asset = Cep18TokenContractRef::new(self.env(), self.asset());
        asset.transfer_from(caller, self.env().self_address(), amount);

        self.env().emit_event(Repaid {
            borrower: caller,
            amount,
            interest_paid: split.interest_paid,
            principal_paid: split.principal_paid,
            remaining_debt: remaining,
            timestamp: now,
        });
        if cleared {
            self.env().emit_event(AccountCleared {
                borrower: caller,
                timestamp: now,
            });
        }

        (amount, remaining)
    }

    fn load_state(&self) -> PoolState {
        PoolState {
            cash: self.cash.get_or_default(),
            total_principal: self.total_principal.get_or_default(),
            accrued_interest: self.accrued_interest.get_or_default(),
            total_shares: self.total_shares.get_or_default(),
            reserve_balance: self.reserve_balance.get_or_default(),
            borrow_index: self.borrow_index.get_or_default(),
            last_accrual_time: self.last_accrual_time.get_or_default(),
        }
    }

    fn store_state(&mut self, state: &PoolState) {
        self.cash.set(state.cash);
        self.total_principal.set(state.total_principal);
        self.accrued_interest.set(state.accrued_interest);
        self.total_shares.set(state.total_shares);
        self.reserve_balance.set(state.reserve_balance);
        self.borrow_index.set(state.borrow_index);
        self.last_accrual_time.set(state.last_accrual_time);
    }

    /// Stored state advanced to `now`, nothing written
    fn accrued_state(&self, now: u64) -> (PoolState, AccrualReport) {
        let params = self.get_params();
        self.ok_or_revert(accrual::accrue(&self.load_state(), &params, now))
    }

    fn projected_state(&self) -> PoolState {
        self.accrued_state(self.now()).0
    }

    /// Write a fully validated post-state
    fn commit(&mut self, mut state: PoolState, report: &AccrualReport, now: u64) {
        self.ok_or_revert(state.sweep_orphaned_assets());
        self.store_state(&state);
        if !report.interest.is_zero() {
            self.env().emit_event(InterestAccrued {
                rate: report.rate,
                interest: report.interest,
                reserve_cut: report.reserve_cut,
                borrow_index: report.borrow_index,
                timestamp: now,
            });
        }
    }

    fn settled_account(&self, user: Address, borrow_index: U256) -> BorrowerAccount {
        let account = self
            .accounts
            .get(&user)
            .unwrap_or_else(|| BorrowerAccount::new(user, borrow_index));
        self.ok_or_revert(account.settle(borrow_index))
    }

    fn projected_account(&self, user: Address) -> BorrowerAccount {
        self.settled_account(user, self.projected_state().borrow_index)
    }

    fn registered_line(&self, user: Address) -> CreditLine {
        CreditRegistryContractRef::new(self.env(), self.registry()).credit_line(user)
    }

    fn only_admin(&self) {
        let caller = self.env().caller();
        let admin = self.admin.get_or_revert_with(CreditError::NotAuthorized);
        if caller != admin {
            self.env().revert(CreditError::NotAuthorized);
        }
    }

    fn now(&self) -> u64 {
        self.env().get_block_time() / 1000
    }

    fn ok_or_revert<T>(&self, result: Result<T, CreditError>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => self.env().revert(error),
        }
    }
}
