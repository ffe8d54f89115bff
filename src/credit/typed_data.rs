//! Structured-data hashing for credit attestations
//!
//! Follows the EIP-712 layout: a domain separator bound to the chain and the
//! registry contract, a struct hash over the attestation fields, and the
//! digest `keccak256(0x19 0x01 ‖ domain_separator ‖ struct_hash)`.
//!
//! Casper addresses are tagged 33-byte values, so address fields are encoded
//! as the keccak256 of their canonical byte serialization instead of the
//! left-padded 20-byte EVM form.
//!
//! The signer (host oracle) and the verifier (registry contract) share these
//! functions, so both sides always hash identical bytes.

use odra::prelude::*;
use odra::casper_types::bytesrepr::{Bytes, ToBytes};
use odra::casper_types::U256;
use sha3::{Digest, Keccak256};

pub const DOMAIN_NAME: &str = "AttestedCreditRegistry";
pub const DOMAIN_VERSION: &str = "1";

pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const LIMIT_UPDATE_TYPE: &str =
    "LimitUpdate(address user,uint256 score,uint256 creditLimit,uint256 expiry,uint256 nonce)";

/// A credit limit granted to `user`, signed by the attester
#[odra::odra_type]
pub struct CreditAttestation {
    pub user: Address,
    /// Opaque score from the scoring backend
    pub score: u32,
    pub credit_limit: U256,
    /// Unix seconds
    pub expiry: u64,
    /// Must equal the registry's current nonce for `user`
    pub nonce: u64,
}

/// Domain the attestation is bound to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedDataDomain {
    pub chain_id: u64,
    pub verifying_contract: Address,
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// 32-byte big-endian word
pub fn u256_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    // Limbs are little-endian u64s
    for (i, limb) in value.0.iter().enumerate() {
        let end = 32 - i * 8;
        word[end - 8..end].copy_from_slice(&limb.to_be_bytes());
    }
    word
}

pub fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn address_word(address: &Address) -> [u8; 32] {
    // Only fails on allocation failure
    let encoded = address.to_bytes().expect("address serialization");
    keccak256(&encoded)
}

pub fn domain_separator(domain: &TypedDataDomain) -> [u8; 32] {
    let mut encoded = Vec::with_capacity(32 * 5);
    encoded.extend_from_slice(&keccak256(DOMAIN_TYPE.as_bytes()));
    encoded.extend_from_slice(&keccak256(DOMAIN_NAME.as_bytes()));
    encoded.extend_from_slice(&keccak256(DOMAIN_VERSION.as_bytes()));
    encoded.extend_from_slice(&u64_word(domain.chain_id));
    encoded.extend_from_slice(&address_word(&domain.verifying_contract));
    keccak256(&encoded)
}

pub fn struct_hash(attestation: &CreditAttestation) -> [u8; 32] {
    let mut encoded = Vec::with_capacity(32 * 6);
    encoded.extend_from_slice(&keccak256(LIMIT_UPDATE_TYPE.as_bytes()));
    encoded.extend_from_slice(&address_word(&attestation.user));
    encoded.extend_from_slice(&u64_word(attestation.score as u64));
    encoded.extend_from_slice(&u256_word(attestation.credit_limit));
    encoded.extend_from_slice(&u64_word(attestation.expiry));
    encoded.extend_from_slice(&u64_word(attestation.nonce));
    keccak256(&encoded)
}

/// Digest the attester signs
pub fn attestation_digest(domain: &TypedDataDomain, attestation: &CreditAttestation) -> [u8; 32] {
    let mut encoded = Vec::with_capacity(2 + 64);
    encoded.extend_from_slice(&[0x19, 0x01]);
    encoded.extend_from_slice(&domain_separator(domain));
    encoded.extend_from_slice(&struct_hash(attestation));
    keccak256(&encoded)
}

/// The digest wrapped as the message passed to the signature scheme
pub fn signing_message(domain: &TypedDataDomain, attestation: &CreditAttestation) -> Bytes {
    Bytes::from(attestation_digest(domain, attestation).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use odra::casper_types::account::AccountHash;

    fn from_hex(hex: &str) -> Vec<u8> {
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect()
    }

    fn account(byte: u8) -> Address {
        Address::Account(AccountHash::new([byte; 32]))
    }

    fn attestation() -> CreditAttestation {
        CreditAttestation {
            user: account(1),
            score: 720,
            credit_limit: U256::from(5_000u128 * 1_000_000_000_000_000_000u128),
            expiry: 1_700_000_000,
            nonce: 0,
        }
    }

    fn domain() -> TypedDataDomain {
        TypedDataDomain {
            chain_id: 1,
            verifying_contract: account(9),
        }
    }

    #[test]
    fn test_keccak_reference_values() {
        assert_eq!(
            keccak256(b"").to_vec(),
            from_hex("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
        assert_eq!(
            keccak256(DOMAIN_TYPE.as_bytes()).to_vec(),
            from_hex("8b73c3c69bb8fe3d512ecc4cf759cc79239f7b179b0ffacaa9a75d522b39400f")
        );
    }

    #[test]
    fn test_words_are_big_endian() {
        let word = u64_word(0x0102);
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0x02);
        assert!(word[..30].iter().all(|b| *b == 0));

        assert_eq!(u256_word(U256::from(0x0102u64)), word);

        let high = u256_word(U256([0, 0, 0, 1u64 << 63]));
        assert_eq!(high[0], 0x80);
        assert!(high[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_address_word_hashes_serialized_address() {
        let user = account(1);
        let serialized = user.to_bytes().unwrap();
        assert_eq!(serialized.len(), 33);
        assert_eq!(address_word(&user), keccak256(&serialized));
        assert_ne!(address_word(&user), keccak256(b""));
        assert_ne!(address_word(&user), address_word(&account(2)));
    }

    #[test]
    fn test_digest_binds_every_field() {
        let base = attestation_digest(&domain(), &attestation());
        assert_eq!(base, attestation_digest(&domain(), &attestation()));

        let mut other = attestation();
        other.nonce = 1;
        assert_ne!(base, attestation_digest(&domain(), &other));

        let mut other = attestation();
        other.credit_limit = other.credit_limit + U256::one();
        assert_ne!(base, attestation_digest(&domain(), &other));

        let mut other = attestation();
        other.score = 721;
        assert_ne!(base, attestation_digest(&domain(), &other));

        let mut other = attestation();
        other.expiry += 1;
        assert_ne!(base, attestation_digest(&domain(), &other));

        let mut other = attestation();
        other.user = account(2);
        assert_ne!(base, attestation_digest(&domain(), &other));
    }

    #[test]
    fn test_digest_binds_domain() {
        let base = attestation_digest(&domain(), &attestation());

        let other_chain = TypedDataDomain { chain_id: 2, ..domain() };
        assert_ne!(base, attestation_digest(&other_chain, &attestation()));

        let other_registry = TypedDataDomain { verifying_contract: account(8), ..domain() };
        assert_ne!(base, attestation_digest(&other_registry, &attestation()));
    }

    #[test]
    fn test_signing_message_is_the_digest() {
        let message = signing_message(&domain(), &attestation());
        assert_eq!(message.len(), 32);
        assert_eq!(&message[..], &attestation_digest(&domain(), &attestation())[..]);
    }
}
