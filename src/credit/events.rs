//! Events for the credit pool and the credit registry

use odra::prelude::*;
use odra::casper_types::{PublicKey, U256};

// ============================================================================
// Lender Events
// ============================================================================

/// Event emitted when a lender supplies liquidity
#[odra::event]
pub struct Deposited {
    /// Address that deposited
    pub lender: Address,
    /// Amount of the asset deposited
    pub amount: U256,
    /// Shares minted
    pub shares: U256,
    /// Timestamp of deposit
    pub timestamp: u64,
}

/// Event emitted when a lender burns shares for liquidity
#[odra::event]
pub struct Withdrawn {
    /// Address that withdrew
    pub lender: Address,
    /// Amount of the asset paid out
    pub amount: U256,
    /// Shares burned
    pub shares: U256,
    /// Timestamp of withdrawal
    pub timestamp: u64,
}

// ============================================================================
// Borrower Events
// ============================================================================

/// Event emitted when a borrower draws against their credit line
#[odra::event]
pub struct Borrowed {
    pub borrower: Address,
    pub amount: U256,
    /// Principal after the draw
    pub principal: U256,
    /// Repayment deadline of the current debt cycle
    pub due_at: u64,
    /// Annual borrow rate after the draw
    pub borrow_rate: U256,
    pub timestamp: u64,
}

/// Event emitted when a borrower repays
#[odra::event]
pub struct Repaid {
    pub borrower: Address,
    pub amount: U256,
    pub interest_paid: U256,
    pub principal_paid: U256,
    /// Debt left on the account
    pub remaining_debt: U256,
    pub timestamp: u64,
}

/// Event emitted when an account's debt reaches zero
#[odra::event]
pub struct AccountCleared {
    pub borrower: Address,
    pub timestamp: u64,
}

// ============================================================================
// Pool Events
// ============================================================================

/// Event emitted when interest is accrued
#[odra::event]
pub struct InterestAccrued {
    /// Annual rate applied
    pub rate: U256,
    /// Interest added to borrower debt
    pub interest: U256,
    /// Part kept by the reserve
    pub reserve_cut: U256,
    /// Borrow index after accrual
    pub borrow_index: U256,
    pub timestamp: u64,
}

/// Event emitted when the admin updates pool parameters
#[odra::event]
pub struct ParamsUpdated {
    pub base_rate: U256,
    pub kink_rate: U256,
    pub max_rate: U256,
    pub kink_utilization: U256,
    pub reserve_bps: u32,
    pub grace_period_seconds: u64,
    pub loan_duration_seconds: u64,
    pub timestamp: u64,
}

/// Event emitted when borrowing is paused or resumed
#[odra::event]
pub struct BorrowPauseSet {
    pub paused: bool,
    pub timestamp: u64,
}

/// Event emitted when admin rights move to a new address
#[odra::event]
pub struct AdminSet {
    pub previous: Address,
    pub admin: Address,
    pub timestamp: u64,
}

// ============================================================================
// Registry Events
// ============================================================================

/// Event emitted when a signed credit limit is registered
#[odra::event]
pub struct LimitRegistered {
    pub user: Address,
    pub score: u32,
    pub credit_limit: U256,
    pub expiry: u64,
    /// Nonce consumed by this registration
    pub nonce: u64,
    pub timestamp: u64,
}

/// Event emitted when the attester key is rotated
#[odra::event]
pub struct AttesterRotated {
    pub previous: PublicKey,
    pub attester: PublicKey,
    pub timestamp: u64,
}
