#![cfg_attr(target_arch = "wasm32", no_std)]
#![cfg_attr(target_arch = "wasm32", no_main)]
extern crate alloc;

// Shared modules
pub mod errors;
pub mod events;
pub mod math;

// Stable asset interface and test token
pub mod token;

// Credit pool, registry and attestation oracle
pub mod credit;
