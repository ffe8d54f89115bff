//! Credit Registry - verifies and stores attested credit limits
//!
//! The attester signs `LimitUpdate` digests off-chain. Anyone may submit a
//! signed attestation; the registry checks the signature against the current
//! attester key, requires the user's exact next nonce, stores the line and
//! advances the nonce in the same call.
//!
//! Rotating the attester invalidates every attestation the previous key
//! signed that has not been registered yet.

use odra::prelude::*;
use odra::casper_types::bytesrepr::Bytes;
use odra::casper_types::{PublicKey, U256};
use super::errors::CreditError;
use super::events::*;
use super::typed_data::{self, CreditAttestation, TypedDataDomain};
use super::zero_address;

/// The last validly registered attestation for a user
#[odra::odra_type]
#[derive(Default)]
pub struct CreditLine {
    pub score: u32,
    pub limit: U256,
    /// Unix seconds, zero when nothing was registered
    pub expiry: u64,
    /// Nonce the line was registered with
    pub nonce: u64,
}

/// Credit Registry contract
#[odra::module(events = [LimitRegistered, AttesterRotated, AdminSet])]
pub struct CreditRegistry {
    /// Key whose signatures are accepted
    attester: Var<PublicKey>,
    /// Admin address
    admin: Var<Address>,
    /// Chain id bound into the signing domain
    chain_id: Var<u64>,
    /// Next expected nonce per user
    nonces: Mapping<Address, u64>,
    /// Registered lines per user
    lines: Mapping<Address, CreditLine>,
}

#[odra::module]
impl CreditRegistry {
    /// Initialize the registry, the deployer becomes admin
    pub fn init(&mut self, attester: PublicKey, chain_id: u64) {
        if Self::is_unset_key(&attester) {
            self.env().revert(CreditError::ZeroAddress);
        }
        self.attester.set(attester);
        self.admin.set(self.env().caller());
        self.chain_id.set(chain_id);
    }

    // ========================================================================
    // Attestations
    // ========================================================================

    /// Check a signature against the current attester
    ///
    /// Pure: writes nothing and ignores nonce or expiry.
    pub fn verify(&self, attestation: CreditAttestation, signature: Bytes) -> bool {
        let attester = match self.attester.get() {
            Some(key) if !Self::is_unset_key(&key) => key,
            _ => return false,
        };
        let message = typed_data::signing_message(&self.domain(), &attestation);
        self.env().verify_signature(&message, &signature, &attester)
    }

    /// Register a signed limit and consume its nonce
    pub fn register_limit(&mut self, attestation: CreditAttestation, signature: Bytes) {
        if attestation.user == zero_address() {
            self.env().revert(CreditError::ZeroAddress);
        }
        if !self.verify(attestation.clone(), signature) {
            self.env().revert(CreditError::LimitInvalid);
        }
        let expected = self.current_nonce(attestation.user);
        if attestation.nonce != expected {
            self.env().revert(CreditError::NonceMismatch);
        }
        let now = self.now();
        if attestation.expiry <= now {
            self.env().revert(CreditError::LimitInvalid);
        }
        let next_nonce = expected
            .checked_add(1)
            .unwrap_or_else(|| self.env().revert(CreditError::ArithmeticOverflow));

        self.lines.set(
            &attestation.user,
            CreditLine {
                score: attestation.score,
                limit: attestation.credit_limit,
                expiry: attestation.expiry,
                nonce: attestation.nonce,
            },
        );
        self.nonces.set(&attestation.user, next_nonce);

        self.env().emit_event(LimitRegistered {
            user: attestation.user,
            score: attestation.score,
            credit_limit: attestation.credit_limit,
            expiry: attestation.expiry,
            nonce: attestation.nonce,
            timestamp: now,
        });
    }

    /// Digest the attester must sign for `attestation`
    pub fn attestation_digest(&self, attestation: CreditAttestation) -> Bytes {
        typed_data::signing_message(&self.domain(), &attestation)
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn attester(&self) -> PublicKey {
        self.attester.get_or_revert_with(CreditError::ZeroAddress)
    }

    pub fn admin(&self) -> Address {
        self.admin.get_or_revert_with(CreditError::NotAuthorized)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id.get_or_default()
    }

    /// Nonce the next attestation for `user` must carry
    pub fn current_nonce(&self, user: Address) -> u64 {
        self.nonces.get(&user).unwrap_or_default()
    }

    /// Last registered line, zeroed when none
    pub fn credit_line(&self, user: Address) -> CreditLine {
        self.lines.get(&user).unwrap_or_default()
    }

    pub fn limit_of(&self, user: Address) -> U256 {
        self.credit_line(user).limit
    }

    pub fn score_of(&self, user: Address) -> u32 {
        self.credit_line(user).score
    }

    pub fn expiry_of(&self, user: Address) -> u64 {
        self.credit_line(user).expiry
    }

    /// Whether `user` holds an unexpired line
    pub fn is_valid(&self, user: Address) -> bool {
        self.credit_line(user).expiry > self.now()
    }

    // ========================================================================
    // Admin Functions
    // ========================================================================

    /// Rotate the attester key
    pub fn set_attester(&mut self, attester: PublicKey) {
        self.only_admin();
        if Self::is_unset_key(&attester) {
            self.env().revert(CreditError::ZeroAddress);
        }
        let previous = self.attester();
        self.attester.set(attester.clone());

        self.env().emit_event(AttesterRotated {
            previous,
            attester,
            timestamp: self.now(),
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
}

impl CreditRegistry {
    fn only_admin(&self) {
        let caller = self.env().caller();
        let admin = self.admin.get_or_revert_with(CreditError::NotAuthorized);
        if caller != admin {
            self.env().revert(CreditError::NotAuthorized);
        }
    }

    fn domain(&self) -> TypedDataDomain {
        TypedDataDomain {
            chain_id: self.chain_id(),
            verifying_contract: self.env().self_address(),
        }
    }

    fn now(&self) -> u64 {
        self.env().get_block_time() / 1000
    }

    fn is_unset_key(key: &PublicKey) -> bool {
        matches!(key, PublicKey::System)
    }
}
