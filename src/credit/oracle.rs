//! Credit Oracle - host-side issuer of signed credit limits
//!
//! The oracle never owns state. The nonce comes from a `NonceSource` (the
//! registry in practice), the key from an `AttestationSigner`, and time from
//! a `Clock`, all injected at construction.

use odra::casper_types::bytesrepr::{Bytes, FromBytes, ToBytes};
use odra::casper_types::{crypto, PublicKey, SecretKey, Signature, U256};
use odra::host::HostEnv;
use odra::prelude::*;
use odra::{OdraError, VmError};
use thiserror::Error;
use super::registry::CreditRegistryHostRef;
use super::typed_data::{self, CreditAttestation, TypedDataDomain};

/// 90 days
pub const DEFAULT_VALIDITY_WINDOW_SECS: u64 = 90 * 24 * 60 * 60;

/// Result of an infrastructure read
///
/// `Unavailable` is never interpreted as a default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading<T> {
    Fresh(T),
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("nonce unavailable: {0}")]
    NonceUnavailable(String),

    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl From<OracleError> for OdraError {
    fn from(error: OracleError) -> Self {
        OdraError::VmError(VmError::Other(error.to_string()))
    }
}

/// Produces signatures over attestation digests
pub trait AttestationSigner {
    fn public_key(&self) -> PublicKey;

    /// Sign `message`, returning the serialized Casper `Signature`
    fn sign(&self, message: &Bytes) -> Result<Bytes, OracleError>;
}

/// Reads the next expected nonce for a user
pub trait NonceSource {
    fn current_nonce(&self, user: Address) -> Reading<u64>;
}

/// Unix seconds
pub trait Clock {
    fn now(&self) -> u64;
}

/// Signs with an account known to an odra `HostEnv`
pub struct HostSigner {
    env: HostEnv,
    account: Address,
}

impl HostSigner {
    pub fn new(env: HostEnv, account: Address) -> Self {
        Self { env, account }
    }
}

impl AttestationSigner for HostSigner {
    fn public_key(&self) -> PublicKey {
        self.env.public_key(&self.account)
    }

    fn sign(&self, message: &Bytes) -> Result<Bytes, OracleError> {
        Ok(self.env.sign_message(message, &self.account))
    }
}

/// Signs with a Casper secret key held in memory
pub struct KeySigner {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeySigner {
    pub fn new(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from(&secret_key);
        Self { secret_key, public_key }
    }
}

impl AttestationSigner for KeySigner {
    fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    fn sign(&self, message: &Bytes) -> Result<Bytes, OracleError> {
        let signature = crypto::sign(&message[..], &self.secret_key, &self.public_key);
        signature
            .to_bytes()
            .map(Bytes::from)
            .map_err(|e| OracleError::Encoding(e.to_string()))
    }
}

impl<T: NonceSource + ?Sized> NonceSource for &T {
    fn current_nonce(&self, user: Address) -> Reading<u64> {
        (**self).current_nonce(user)
    }
}

impl NonceSource for CreditRegistryHostRef {
    fn current_nonce(&self, user: Address) -> Reading<u64> {
        match self.try_current_nonce(user) {
            Ok(nonce) => Reading::Fresh(nonce),
            Err(e) => Reading::Unavailable(format!("{:?}", e)),
        }
    }
}

impl Clock for HostEnv {
    fn now(&self) -> u64 {
        self.block_time() / 1000
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    pub chain_id: u64,
    /// Registry contract the attestations are bound to
    pub registry: Address,
    /// Lifetime of an issued attestation
    pub validity_window_secs: u64,
}

impl OracleConfig {
    pub fn new(chain_id: u64, registry: Address) -> Self {
        Self {
            chain_id,
            registry,
            validity_window_secs: DEFAULT_VALIDITY_WINDOW_SECS,
        }
    }
}

/// An attestation with its detached signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAttestation {
    pub attestation: CreditAttestation,
    pub signature: Bytes,
    pub digest: [u8; 32],
}

pub struct CreditOracle<S, N, C> {
    config: OracleConfig,
    signer: S,
    nonces: N,
    clock: C,
}

impl<S: AttestationSigner, N: NonceSource, C: Clock> CreditOracle<S, N, C> {
    pub fn new(config: OracleConfig, signer: S, nonces: N, clock: C) -> Self {
        Self { config, signer, nonces, clock }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn attester(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn domain(&self) -> TypedDataDomain {
        TypedDataDomain {
            chain_id: self.config.chain_id,
            verifying_contract: self.config.registry,
        }
    }

    /// Sign a limit for `user` at the registry's current nonce
    ///
    /// Fails rather than signing when the nonce cannot be read.
    pub fn create_attestation(
        &self,
        user: Address,
        score: u32,
        credit_limit: U256,
    ) -> Result<SignedAttestation, OracleError> {
        let nonce = match self.nonces.current_nonce(user) {
            Reading::Fresh(nonce) => nonce,
            Reading::Unavailable(reason) => {
                tracing::warn!(?user, %reason, "refusing to sign without a fresh nonce");
                return Err(OracleError::NonceUnavailable(reason));
            }
        };
        let expiry = self
            .clock
            .now()
            .saturating_add(self.config.validity_window_secs);

        let attestation = CreditAttestation {
            user,
            score,
            credit_limit,
            expiry,
            nonce,
        };
        let domain = self.domain();
        let digest = typed_data::attestation_digest(&domain, &attestation);
        let signature = self.signer.sign(&typed_data::signing_message(&domain, &attestation))?;

        tracing::info!(?user, score, %credit_limit, expiry, nonce, "credit attestation issued");
        Ok(SignedAttestation {
            attestation,
            signature,
            digest,
        })
    }

    /// Check `signature` against this oracle's key
    pub fn verify(&self, attestation: &CreditAttestation, signature: &Bytes) -> bool {
        let message = typed_data::signing_message(&self.domain(), attestation);
        let signature = match Signature::from_bytes(&signature[..]) {
            Ok((signature, rest)) if rest.is_empty() => signature,
            _ => {
                tracing::debug!("malformed attestation signature");
                return false;
            }
        };
        crypto::verify(&message[..], &signature, &self.signer.public_key()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odra::casper_types::account::AccountHash;
    use std::cell::Cell;

    struct FixedNonce(Reading<u64>);

    impl NonceSource for FixedNonce {
        fn current_nonce(&self, _user: Address) -> Reading<u64> {
            self.0.clone()
        }
    }

    struct FixedClock(Cell<u64>);

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            self.0.get()
        }
    }

    fn account(byte: u8) -> Address {
        Address::Account(AccountHash::new([byte; 32]))
    }

    fn signer(seed: u8) -> KeySigner {
        KeySigner::new(SecretKey::ed25519_from_bytes([seed; 32]).unwrap())
    }

    fn oracle(nonce: Reading<u64>) -> CreditOracle<KeySigner, FixedNonce, FixedClock> {
        CreditOracle::new(
            OracleConfig::new(7, account(200)),
            signer(1),
            FixedNonce(nonce),
            FixedClock(Cell::new(1_000)),
        )
    }

    #[test]
    fn test_attestation_fields() {
        let oracle = oracle(Reading::Fresh(4));
        let signed = oracle
            .create_attestation(account(1), 700, U256::from(5_000))
            .unwrap();

        assert_eq!(signed.attestation.user, account(1));
        assert_eq!(signed.attestation.score, 700);
        assert_eq!(signed.attestation.credit_limit, U256::from(5_000));
        assert_eq!(signed.attestation.nonce, 4);
        assert_eq!(signed.attestation.expiry, 1_000 + DEFAULT_VALIDITY_WINDOW_SECS);
        assert_eq!(
            signed.digest,
            typed_data::attestation_digest(&oracle.domain(), &signed.attestation)
        );
    }

    #[test]
    fn test_signature_verifies() {
        let oracle = oracle(Reading::Fresh(0));
        let signed = oracle
            .create_attestation(account(1), 650, U256::from(900))
            .unwrap();
        assert!(oracle.verify(&signed.attestation, &signed.signature));
    }

    #[test]
    fn test_tampered_attestation_fails() {
        let oracle = oracle(Reading::Fresh(0));
        let signed = oracle
            .create_attestation(account(1), 650, U256::from(900))
            .unwrap();

        let mut raised = signed.attestation.clone();
        raised.credit_limit = U256::from(9_000);
        assert!(!oracle.verify(&raised, &signed.signature));

        assert!(!oracle.verify(&signed.attestation, &Bytes::from(vec![1u8, 2, 3])));
    }

    #[test]
    fn test_other_key_is_rejected() {
        let issuer = oracle(Reading::Fresh(0));
        let signed = issuer
            .create_attestation(account(1), 650, U256::from(900))
            .unwrap();

        let other = CreditOracle::new(
            issuer.config().clone(),
            signer(2),
            FixedNonce(Reading::Fresh(0)),
            FixedClock(Cell::new(1_000)),
        );
        assert!(!other.verify(&signed.attestation, &signed.signature));
    }

    #[test]
    fn test_unavailable_nonce_is_an_error() {
        let oracle = oracle(Reading::Unavailable(String::from("registry offline")));
        assert_eq!(
            oracle.create_attestation(account(1), 650, U256::from(900)),
            Err(OracleError::NonceUnavailable(String::from("registry offline")))
        );
    }

    #[test]
    fn test_oracle_error_keeps_reason() {
        let error = OdraError::from(OracleError::NonceUnavailable(String::from("registry offline")));
        assert_eq!(
            error,
            OdraError::VmError(VmError::Other(String::from("nonce unavailable: registry offline")))
        );
    }

    #[test]
    fn test_creation_does_not_consume_nonce() {
        let oracle = oracle(Reading::Fresh(3));
        let first = oracle.create_attestation(account(1), 650, U256::from(900)).unwrap();
        oracle.clock.0.set(2_000);
        let second = oracle.create_attestation(account(1), 650, U256::from(900)).unwrap();
        assert_eq!(first.attestation.nonce, second.attestation.nonce);
        assert_eq!(second.attestation.expiry, 2_000 + DEFAULT_VALIDITY_WINDOW_SECS);
    }
}
