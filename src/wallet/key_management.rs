// src/wallet/key_management.rs
//! Cryptographic key management for registry principals.
//!
//! Principals are Ethereum-style addresses derived from secp256k1 public keys.
//! Issuers sign the credential hash they register, and verifiers recover the
//! signing address from that signature to compare it with the controller of
//! the issuer's identifier.
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 curve (via `k256` crate)
//! - Keccak-256 hashing (via `ethers-core`)
//! - Cryptographically secure random number generation

use crate::utils::crypto::hash_data;
use ethers_core::types::{Address, H256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use rand::rngs::OsRng;
use thiserror::Error;

/// Length of an `r || s || v` recoverable signature.
pub const SIGNATURE_LENGTH: usize = 65;

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("signature must be {SIGNATURE_LENGTH} bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("malformed signature: {0}")]
    Malformed(#[from] k256::ecdsa::Error),

    #[error("invalid secret key")]
    InvalidKey,
}

/// Key manager holding one secp256k1 signing key.
///
/// # Security Notes
/// - Secret keys are never exposed publicly
/// - Uses cryptographically secure random number generation
/// - Signatures are deterministic (RFC 6979)
#[derive(Clone)]
pub struct KeyManager {
    /// Securely stored private key (never exposed)
    signing_key: SigningKey,
    address: Address,
}

impl KeyManager {
    /// Generates a new KeyManager with a fresh random key.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Loads a key from its 32-byte big-endian scalar.
    ///
    /// # Errors
    /// `SignatureError::InvalidKey` if the bytes are zero or not below the
    /// curve order.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, SignatureError> {
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_of(signing_key.verifying_key());
        KeyManager { signing_key, address }
    }

    /// Address of the principal this key acts for.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs a registry hash (credential or document digest).
    ///
    /// # Process Flow
    /// 1. Hashes the 32 bytes again with Keccak-256 (the signing prehash)
    /// 2. Signs the prehash using recoverable ECDSA
    /// 3. Serializes as `r || s || v` (65 bytes)
    ///
    /// # Errors
    /// Only fails if the underlying signer rejects the prehash, which does not
    /// happen for 32-byte inputs.
    pub fn sign_hash(&self, hash: H256) -> Result<Vec<u8>, SignatureError> {
        let prehash = hash_data(hash.as_bytes());
        let (signature, recovery_id) = self.signing_key.sign_prehash_recoverable(&prehash)?;

        let mut bytes = Vec::with_capacity(SIGNATURE_LENGTH);
        bytes.extend_from_slice(&signature.to_bytes());
        bytes.push(recovery_id.to_byte());
        Ok(bytes)
    }
}

/// Recovers the address that produced `signature` over `hash`.
///
/// Accepts `v` as either `0/1` or the legacy Ethereum `27/28`.
pub fn recover_signer(hash: H256, signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(SignatureError::InvalidLength(signature.len()));
    }

    let v = signature[64];
    let normalized = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(normalized).ok_or(SignatureError::InvalidRecoveryId(v))?;
    let signature = Signature::from_slice(&signature[..64])?;

    let prehash = hash_data(hash.as_bytes());
    let key = VerifyingKey::recover_from_prehash(&prehash, &signature, recovery_id)?;
    Ok(address_of(&key))
}

/// Ethereum address: last 20 bytes of keccak256 over the uncompressed point
/// without its `0x04` tag.
fn address_of(key: &VerifyingKey) -> Address {
    let point = PublicKey::from(key).to_encoded_point(false);
    let digest = hash_data(&point.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_known_key_address() {
        // Private key 1 maps to this well-known address.
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let keys = KeyManager::from_secret_bytes(&secret).unwrap();
        let expected = Address::from_str("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf").unwrap();
        assert_eq!(keys.address(), expected);
    }

    #[test]
    fn test_sign_and_recover() {
        let keys = KeyManager::generate();
        let hash = H256::repeat_byte(0xcc);

        let signature = keys.sign_hash(hash).unwrap();
        assert_eq!(signature.len(), SIGNATURE_LENGTH);
        assert_eq!(recover_signer(hash, &signature).unwrap(), keys.address());
    }

    #[test]
    fn test_legacy_v_accepted() {
        let keys = KeyManager::generate();
        let hash = H256::repeat_byte(0x01);
        let mut signature = keys.sign_hash(hash).unwrap();
        signature[64] += 27;
        assert_eq!(recover_signer(hash, &signature).unwrap(), keys.address());
    }

    #[test]
    fn test_signature_over_other_hash_recovers_other_address() {
        let keys = KeyManager::generate();
        let signature = keys.sign_hash(H256::repeat_byte(0x01)).unwrap();
        let recovered = recover_signer(H256::repeat_byte(0x02), &signature);
        // Either recovery fails or it yields an unrelated key.
        assert!(recovered.map_or(true, |address| address != keys.address()));
    }

    #[test]
    fn test_malformed_signatures() {
        assert!(matches!(
            recover_signer(H256::zero(), &[0u8; 10]),
            Err(SignatureError::InvalidLength(10))
        ));

        let mut bad_v = vec![1u8; SIGNATURE_LENGTH];
        bad_v[64] = 9;
        assert!(matches!(
            recover_signer(H256::zero(), &bad_v),
            Err(SignatureError::InvalidRecoveryId(9))
        ));

        // r = s = 0 is never a valid signature
        let zeros = vec![0u8; SIGNATURE_LENGTH];
        assert!(matches!(recover_signer(H256::zero(), &zeros), Err(SignatureError::Malformed(_))));
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert!(matches!(
            KeyManager::from_secret_bytes(&[0u8; 32]),
            Err(SignatureError::InvalidKey)
        ));
    }
}
