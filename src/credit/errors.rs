//! Error types for the credit pool and registry

use odra::prelude::*;

/// Errors raised by the pool ledger, the accrual engine and the credit registry
#[odra::odra_error]
pub enum CreditError {
    /// Amount (or share count) must be greater than zero
    ZeroAmount = 1,
    /// Caller holds fewer shares than requested
    InsufficientShares = 2,
    /// Pool cash cannot cover the payout or loan
    InsufficientLiquidity = 3,
    /// No registered limit, limit expired, or signature does not match the attester
    LimitInvalid = 4,
    /// Borrow would exceed the attested credit limit
    CreditExceeded = 5,
    /// Attestation nonce differs from the registry counter
    NonceMismatch = 6,
    /// Repayment exceeds the outstanding debt
    OverRepayment = 7,
    /// Pool parameters out of bounds
    BadParams = 8,
    /// Caller is not the admin
    NotAuthorized = 9,
    /// Zero address or system key supplied
    ZeroAddress = 10,
    /// Checked arithmetic failed
    ArithmeticOverflow = 11,
    /// Borrowing is paused by the admin
    BorrowPaused = 12,
    /// Account is past its grace deadline and may only repay
    AccountDefaulted = 13,
}
