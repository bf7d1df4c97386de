// src/bootstrap.rs
//! Wires the registries to the storage backend chosen in [`StorageSettings`].

use crate::contracts::{CredentialRegistry, IdentifierRegistry};
use crate::models::credential::CredentialRecord;
use crate::models::did::IdentifierRecord;
use crate::settings::{StorageBackend, StorageSettings};
use crate::storage::{FileStore, StorageError};
use crate::utils::clock::Clock;
use ethers_core::types::{Address, H256};
use log::info;
use std::sync::Arc;

pub const IDENTIFIER_TABLE: &str = "identifiers.json";
pub const CONTROLLER_INDEX: &str = "controllers.json";
pub const CREDENTIAL_TABLE: &str = "credentials.json";

/// Both registries, shareable across request handlers.
#[derive(Clone)]
pub struct Registries {
    pub identifiers: Arc<IdentifierRegistry>,
    pub credentials: Arc<CredentialRegistry>,
}

impl Registries {
    /// Opens the registries on the configured backend.
    ///
    /// # Errors
    /// File backend only: the data directory or an existing table cannot be
    /// read.
    pub fn open(storage: &StorageSettings, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        let (identifiers, credentials) = match storage.backend {
            StorageBackend::Memory => {
                info!("using in-memory registry storage");
                (
                    IdentifierRegistry::in_memory(clock.clone()),
                    CredentialRegistry::in_memory(clock),
                )
            }
            StorageBackend::File => {
                let dir = &storage.data_dir;
                info!("using file registry storage in {}", dir.display());
                (
                    IdentifierRegistry::new(
                        Arc::new(FileStore::<String, IdentifierRecord>::open(dir.join(IDENTIFIER_TABLE))?),
                        Arc::new(FileStore::<Address, String>::open(dir.join(CONTROLLER_INDEX))?),
                        clock.clone(),
                    ),
                    CredentialRegistry::new(
                        Arc::new(FileStore::<H256, CredentialRecord>::open(dir.join(CREDENTIAL_TABLE))?),
                        clock,
                    ),
                )
            }
        };

        Ok(Registries {
            identifiers: Arc::new(identifiers),
            credentials: Arc::new(credentials),
        })
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Registries {
            identifiers: Arc::new(IdentifierRegistry::in_memory(clock.clone())),
            credentials: Arc::new(CredentialRegistry::in_memory(clock)),
        }
    }
}
