// src/models/did.rs
//! Identifier record data model.
//!
//! An identifier (typically a DID string such as `did:ex:abc`) is bound to a
//! controlling principal and to a pointer at its off-chain document: the
//! document's integrity hash plus the location it can be fetched from.

use ethers_core::types::{Address, H256};
use serde::{Deserialize, Serialize};

/// Registry entry for a single identifier.
///
/// # Fields
/// - `identifier`: The identifier string, also the table key
/// - `controller`: Principal allowed to mutate this record
/// - `document_hash`: Keccak-256 digest of the off-chain document
/// - `document_location`: URI where the document can be fetched
/// - `registered_at`: Unix seconds at registration, never changes
/// - `updated_at`: Unix seconds of the last document update or transfer
///
/// # Discovery
/// The hash tells a resolver what to verify and the location tells it where
/// to look. The registry only ever replaces both together.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRecord {
    /// Example: "did:ex:abc"
    pub identifier: String,

    pub controller: Address,

    pub document_hash: H256,

    /// Example: "ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
    pub document_location: String,

    pub registered_at: u64,

    pub updated_at: u64,
}

impl IdentifierRecord {
    /// Returns `true` if `principal` controls this identifier.
    pub fn is_controlled_by(&self, principal: Address) -> bool {
        self.controller == principal
    }
}
