// src/contracts/mod.rs
//! The two registries and their shared error taxonomy.
//!
//! Each registry mirrors one of the on-chain contracts: same tables, same
//! guards, same events, but over injected storage instead of contract state.

pub mod credential_registry;
pub mod did_registry;
pub mod error;

pub use credential_registry::CredentialRegistry;
pub use did_registry::IdentifierRegistry;
pub use error::{ErrorKind, RegistryError};
