// src/lib.rs
//! # SSI Registry
//!
//! Identifier and credential registries for a self-sovereign identity system.
//!
//! ## Layout
//! 1. **Contracts**: [`IdentifierRegistry`](contracts::IdentifierRegistry) and
//!    [`CredentialRegistry`](contracts::CredentialRegistry), the state machines
//! 2. **Storage**: the [`KeyValueStore`](storage::KeyValueStore) seam with memory
//!    and file backends
//! 3. **Services**: credential verification, the event log and the HTTP API
//! 4. **Wallet**: secp256k1 keys for issuers and holders

pub mod bootstrap;
pub mod contracts;
pub mod models;
pub mod services;
pub mod settings;
pub mod storage;
pub mod utils;
pub mod wallet;
