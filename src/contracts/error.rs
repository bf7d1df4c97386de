// src/contracts/error.rs
//! Error taxonomy shared by the identifier and credential registries.

use crate::storage::StorageError;
use ethers_core::types::{Address, H256};
use serde::Serialize;
use thiserror::Error;

/// Every way a registry operation can be refused.
///
/// A returned error always means the operation had no effect: no record was
/// written and no event was emitted.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("identifier `{0}` is not registered")]
    IdentifierNotFound(String),

    #[error("identifier `{0}` is already registered")]
    IdentifierAlreadyExists(String),

    /// Caller already controls an identifier and may only hold one.
    #[error("{controller:?} already controls identifier `{identifier}`")]
    AlreadyHasIdentifier { controller: Address, identifier: String },

    /// Transfer target already controls a different identifier.
    #[error("transfer target {controller:?} already controls identifier `{identifier}`")]
    TargetAlreadyHasIdentifier { controller: Address, identifier: String },

    #[error("identifier must not be empty")]
    EmptyIdentifier,

    #[error("document location must not be empty")]
    EmptyLocation,

    #[error("the zero address cannot act as a principal")]
    ZeroAddress,

    #[error("{caller:?} is not authorized; operation requires {required:?}")]
    Unauthorized { caller: Address, required: Address },

    #[error("credential {0:?} is already registered")]
    CredentialAlreadyRegistered(H256),

    #[error("credential {0:?} is not registered")]
    CredentialNotFound(H256),

    #[error("credential {0:?} is already revoked")]
    AlreadyRevoked(H256),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Coarse classification of [`RegistryError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Unauthorized,
    InvariantViolation,
    AlreadyRevoked,
    Storage,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::IdentifierNotFound(_) | RegistryError::CredentialNotFound(_) => {
                ErrorKind::NotFound
            }
            RegistryError::IdentifierAlreadyExists(_)
            | RegistryError::CredentialAlreadyRegistered(_) => ErrorKind::AlreadyExists,
            RegistryError::Unauthorized { .. } => ErrorKind::Unauthorized,
            RegistryError::EmptyIdentifier
            | RegistryError::EmptyLocation
            | RegistryError::ZeroAddress
            | RegistryError::AlreadyHasIdentifier { .. }
            | RegistryError::TargetAlreadyHasIdentifier { .. } => ErrorKind::InvariantViolation,
            RegistryError::AlreadyRevoked(_) => ErrorKind::AlreadyRevoked,
            RegistryError::Storage(_) => ErrorKind::Storage,
        }
    }
}
