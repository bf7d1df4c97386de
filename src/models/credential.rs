// src/models/credential.rs
//! Credential status data model.
//!
//! The registry never sees credential contents. A credential is represented by
//! its integrity hash, the principal that registered it, and whether that
//! principal has since revoked it.

use ethers_core::types::{Address, H256};
use serde::{Deserialize, Serialize};

/// Issuance and revocation status of one credential.
///
/// # Lifecycle
/// `Unregistered → Registered(active) → Registered(revoked)`. There is no
/// transition back from revoked and records are never removed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Keccak-256 digest of the issued credential
    pub credential_hash: H256,

    /// Principal that registered the hash; the only one allowed to revoke it
    pub issuer: Address,

    pub revoked: bool,

    /// Unix seconds at registration
    pub registered_at: u64,
}

impl CredentialRecord {
    pub fn status(&self) -> CredentialStatus {
        if self.revoked {
            CredentialStatus::Revoked
        } else {
            CredentialStatus::Active
        }
    }
}

/// Position of a credential hash in its lifecycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Unregistered,
    Active,
    Revoked,
}

impl CredentialStatus {
    /// Status for an optional lookup result.
    pub fn of(record: Option<&CredentialRecord>) -> Self {
        record.map_or(CredentialStatus::Unregistered, CredentialRecord::status)
    }
}
