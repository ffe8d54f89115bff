//! Error definitions for the stable asset token
use odra::prelude::*;

/// Custom errors for the MockStable token contract
#[odra::odra_error]
pub enum TokenError {
    /// Insufficient allowance for transfer
    InsufficientAllowance = 200,

    /// Insufficient balance for operation
    InsufficientBalance = 201,

    /// Supply or balance would overflow
    Overflow = 202,
}
