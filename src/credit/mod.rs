//! Attested Credit - peer-to-pool lending against signed credit limits
//!
//! Lenders deposit a stable asset into a shared pool for shares. Borrowers
//! draw against a limit that an off-chain attester signs and the registry
//! verifies, then repay principal plus utilization-priced interest.
//!
//! - `rate_model`, `shares`, `accrual`, `borrower`: pure accounting
//! - `typed_data`: attestation hashing shared by signer and verifier
//! - `registry`, `pool`: the contracts
//! - `oracle`: host-side attestation issuer

use odra::prelude::*;
use odra::casper_types::account::AccountHash;

pub mod errors;
pub mod events;
pub mod rate_model;
pub mod shares;
pub mod accrual;
pub mod borrower;
pub mod typed_data;
pub mod registry;
pub mod pool;
#[cfg(not(target_arch = "wasm32"))]
pub mod oracle;

pub use errors::CreditError;
pub use events::*;
pub use rate_model::PoolParams;
pub use accrual::{AccrualReport, PoolState};
pub use borrower::{AccountStatus, BorrowerAccount, BorrowerDebt};
pub use typed_data::CreditAttestation;
pub use registry::{CreditLine, CreditRegistry};
pub use pool::CreditPool;

/// The all-zero account address, never a valid user or admin
pub fn zero_address() -> Address {
    Address::Account(AccountHash::new([0u8; 32]))
}
