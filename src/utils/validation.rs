// src/utils/validation.rs
//! Argument checks shared by both registries.
//!
//! Each check maps to a single `RegistryError` variant so callers can rely on
//! a stable failure for a given bad input.

use crate::contracts::error::RegistryError;
use ethers_core::types::Address;

/// Rejects the zero address, which the registries reserve to mean "nobody".
pub fn require_principal(address: Address) -> Result<(), RegistryError> {
    if address.is_zero() {
        return Err(RegistryError::ZeroAddress);
    }
    Ok(())
}

/// Identifiers are table keys; the empty string would also be
/// indistinguishable from "no identifier" in the reverse index.
pub fn require_identifier(identifier: &str) -> Result<(), RegistryError> {
    if identifier.trim().is_empty() {
        return Err(RegistryError::EmptyIdentifier);
    }
    Ok(())
}

/// A document hash without a location cannot be resolved to a document.
pub fn require_location(location: &str) -> Result<(), RegistryError> {
    if location.trim().is_empty() {
        return Err(RegistryError::EmptyLocation);
    }
    Ok(())
}
