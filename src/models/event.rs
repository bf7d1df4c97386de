// src/models/event.rs
//! Change notifications emitted by the registries.
//!
//! Every successful mutation produces exactly one event carrying enough data
//! for an off-chain indexer to replay the state transition. Delivery is best
//! effort; consumers that miss events fall back to direct queries.

use ethers_core::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    IdentifierRegistered {
        identifier: String,
        controller: Address,
        document_hash: H256,
        document_location: String,
        timestamp: u64,
    },
    /// Carries both hashes so auditors can follow the document history.
    DocumentUpdated {
        identifier: String,
        controller: Address,
        old_hash: H256,
        new_hash: H256,
        document_location: String,
        timestamp: u64,
    },
    OwnershipTransferred {
        identifier: String,
        previous_controller: Address,
        new_controller: Address,
        timestamp: u64,
    },
    CredentialRegistered {
        credential_hash: H256,
        issuer: Address,
        timestamp: u64,
    },
    CredentialRevoked {
        credential_hash: H256,
        issuer: Address,
        timestamp: u64,
    },
}

impl RegistryEvent {
    /// Short label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            RegistryEvent::IdentifierRegistered { .. } => "IDENTIFIER_REGISTERED",
            RegistryEvent::DocumentUpdated { .. } => "DOCUMENT_UPDATED",
            RegistryEvent::OwnershipTransferred { .. } => "OWNERSHIP_TRANSFERRED",
            RegistryEvent::CredentialRegistered { .. } => "CREDENTIAL_REGISTERED",
            RegistryEvent::CredentialRevoked { .. } => "CREDENTIAL_REVOKED",
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            RegistryEvent::IdentifierRegistered { timestamp, .. }
            | RegistryEvent::DocumentUpdated { timestamp, .. }
            | RegistryEvent::OwnershipTransferred { timestamp, .. }
            | RegistryEvent::CredentialRegistered { timestamp, .. }
            | RegistryEvent::CredentialRevoked { timestamp, .. } => *timestamp,
        }
    }
}

/// Receiver for registry events.
///
/// Passed into every mutating registry call and invoked once, after the
/// mutation is committed. Implementations must not call back into the
/// registry that is emitting.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RegistryEvent);
}

/// Collects events in order; handy for embedding and tests.
impl EventSink for Mutex<Vec<RegistryEvent>> {
    fn emit(&self, event: RegistryEvent) {
        // A poisoned buffer still holds every event pushed before the panic.
        let mut events = match self.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
    }
}

/// Discards events.
impl EventSink for () {
    fn emit(&self, _event: RegistryEvent) {}
}
