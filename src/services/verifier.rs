// src/services/verifier.rs
//! Credential verification service.
//!
//! Composes the two registries the way a relying party does: the issuer's
//! identifier tells us which principal may sign for it, the signature tells us
//! who actually signed, and the credential registry tells us who registered
//! the credential and whether it has been revoked since.

use crate::contracts::{CredentialRegistry, IdentifierRegistry, RegistryError};
use crate::wallet::key_management::recover_signer;
use ethers_core::types::{Address, H256};
use log::debug;
use serde::Serialize;
use std::sync::Arc;

/// Why a credential failed verification.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Issuer identifier is not registered.
    UnknownIssuer,
    /// Signature bytes could not be parsed or recovered.
    InvalidSignature,
    /// Signature was not made by the identifier's controller.
    SignerMismatch,
    /// Credential hash was never registered.
    NotRegistered,
    /// Credential was registered by someone other than the controller.
    IssuerMismatch,
    Revoked,
}

/// Outcome of [`CredentialVerifier::verify`].
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Rejection>,
    /// Controller of the issuer identifier at verification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Address>,
}

impl Verification {
    fn accepted(issuer: Address) -> Self {
        Verification {
            valid: true,
            reason: None,
            issuer: Some(issuer),
        }
    }

    fn rejected(reason: Rejection, issuer: Option<Address>) -> Self {
        Verification {
            valid: false,
            reason: Some(reason),
            issuer,
        }
    }
}

/// Read-only verifier over shared registries.
#[derive(Clone)]
pub struct CredentialVerifier {
    identifiers: Arc<IdentifierRegistry>,
    credentials: Arc<CredentialRegistry>,
}

impl CredentialVerifier {
    pub fn new(identifiers: Arc<IdentifierRegistry>, credentials: Arc<CredentialRegistry>) -> Self {
        Self {
            identifiers,
            credentials,
        }
    }

    /// Verifies a credential against both registries.
    ///
    /// # Arguments
    /// * `credential_hash` - Digest of the presented credential
    /// * `issuer_identifier` - Identifier the credential claims as issuer
    /// * `signature` - 65-byte recoverable signature over `credential_hash`
    ///
    /// # Returns
    /// - `Ok(Verification { valid: true, .. })` if every check passes
    /// - `Ok(Verification { valid: false, reason, .. })` on the first failed check
    /// - `Err` only if a registry could not be read
    ///
    /// # Process Flow
    /// 1. Resolves the issuer identifier to its controller
    /// 2. Recovers the signer and compares it with the controller
    /// 3. Checks the credential was registered by that controller
    /// 4. Checks the credential is not revoked
    pub fn verify(
        &self,
        credential_hash: H256,
        issuer_identifier: &str,
        signature: &[u8],
    ) -> Result<Verification, RegistryError> {
        let Some(issuer) = self.identifiers.resolve(issuer_identifier)? else {
            return Ok(Verification::rejected(Rejection::UnknownIssuer, None));
        };
        let controller = issuer.controller;

        let signer = match recover_signer(credential_hash, signature) {
            Ok(signer) => signer,
            Err(e) => {
                debug!("signature for {:?} rejected: {}", credential_hash, e);
                return Ok(Verification::rejected(Rejection::InvalidSignature, Some(controller)));
            }
        };
        if signer != controller {
            return Ok(Verification::rejected(Rejection::SignerMismatch, Some(controller)));
        }

        let Some(record) = self.credentials.get(credential_hash)? else {
            return Ok(Verification::rejected(Rejection::NotRegistered, Some(controller)));
        };
        if record.issuer != controller {
            return Ok(Verification::rejected(Rejection::IssuerMismatch, Some(controller)));
        }
        if record.revoked {
            return Ok(Verification::rejected(Rejection::Revoked, Some(controller)));
        }

        Ok(Verification::accepted(controller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use crate::utils::crypto::digest;
    use crate::wallet::key_management::KeyManager;

    const ISSUER_DID: &str = "did:ex:university";

    struct Fixture {
        verifier: CredentialVerifier,
        identifiers: Arc<IdentifierRegistry>,
        credentials: Arc<CredentialRegistry>,
        issuer: KeyManager,
        credential: H256,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(1));
        let identifiers = Arc::new(IdentifierRegistry::in_memory(clock.clone()));
        let credentials = Arc::new(CredentialRegistry::in_memory(clock));
        let issuer = KeyManager::generate();
        let credential = digest(b"{\"degree\":\"BSc\"}");

        identifiers
            .register(issuer.address(), ISSUER_DID, digest(b"doc"), "ipfs://QmIssuer", &())
            .unwrap();
        credentials.register(issuer.address(), credential, &()).unwrap();

        Fixture {
            verifier: CredentialVerifier::new(identifiers.clone(), credentials.clone()),
            identifiers,
            credentials,
            issuer,
            credential,
        }
    }

    #[test]
    fn test_valid_credential() {
        let f = fixture();
        let signature = f.issuer.sign_hash(f.credential).unwrap();

        let outcome = f.verifier.verify(f.credential, ISSUER_DID, &signature).unwrap();
        assert_eq!(outcome, Verification::accepted(f.issuer.address()));
    }

    #[test]
    fn test_revoked_credential() {
        let f = fixture();
        let signature = f.issuer.sign_hash(f.credential).unwrap();
        f.credentials.revoke(f.issuer.address(), f.credential, &()).unwrap();

        let outcome = f.verifier.verify(f.credential, ISSUER_DID, &signature).unwrap();
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, Some(Rejection::Revoked));
    }

    #[test]
    fn test_unknown_issuer() {
        let f = fixture();
        let signature = f.issuer.sign_hash(f.credential).unwrap();

        let outcome = f.verifier.verify(f.credential, "did:ex:nobody", &signature).unwrap();
        assert_eq!(outcome.reason, Some(Rejection::UnknownIssuer));
        assert_eq!(outcome.issuer, None);
    }

    #[test]
    fn test_signature_from_other_key() {
        let f = fixture();
        let forger = KeyManager::generate();
        let signature = forger.sign_hash(f.credential).unwrap();

        let outcome = f.verifier.verify(f.credential, ISSUER_DID, &signature).unwrap();
        assert_eq!(outcome.reason, Some(Rejection::SignerMismatch));
    }

    #[test]
    fn test_garbage_signature() {
        let f = fixture();
        let outcome = f.verifier.verify(f.credential, ISSUER_DID, &[0u8; 3]).unwrap();
        assert_eq!(outcome.reason, Some(Rejection::InvalidSignature));
    }

    #[test]
    fn test_unregistered_credential() {
        let f = fixture();
        let unknown = digest(b"never registered");
        let signature = f.issuer.sign_hash(unknown).unwrap();

        let outcome = f.verifier.verify(unknown, ISSUER_DID, &signature).unwrap();
        assert_eq!(outcome.reason, Some(Rejection::NotRegistered));
    }

    #[test]
    fn test_credential_registered_by_someone_else() {
        let f = fixture();
        let squatted = digest(b"squatted");
        let squatter = KeyManager::generate();
        f.credentials.register(squatter.address(), squatted, &()).unwrap();
        let signature = f.issuer.sign_hash(squatted).unwrap();

        let outcome = f.verifier.verify(squatted, ISSUER_DID, &signature).unwrap();
        assert_eq!(outcome.reason, Some(Rejection::IssuerMismatch));
    }

    #[test]
    fn test_transferred_identifier_follows_new_controller() {
        let f = fixture();
        let successor = KeyManager::generate();
        f.identifiers
            .transfer_ownership(f.issuer.address(), ISSUER_DID, successor.address(), &())
            .unwrap();

        // Old key no longer speaks for the identifier
        let signature = f.issuer.sign_hash(f.credential).unwrap();
        let outcome = f.verifier.verify(f.credential, ISSUER_DID, &signature).unwrap();
        assert_eq!(outcome.reason, Some(Rejection::SignerMismatch));
        assert_eq!(outcome.issuer, Some(successor.address()));
    }
}
