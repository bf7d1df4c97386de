// src/contracts/did_registry.rs
//! Identifier registry.
//!
//! Maps an identifier string to its controller and to the integrity pointer of
//! its off-chain document. Any principal may register one identifier; after
//! that only the controller may update the document pointer or hand the
//! identifier to another principal.
//!
//! # Tables
//! - records: `identifier → IdentifierRecord`
//! - controllers: `controller → identifier` (reverse index, one entry per
//!   principal)
//!
//! Both tables are written under a single registry-wide write gate, so a
//! reader never sees the record and the reverse index disagree.

use crate::contracts::error::RegistryError;
use crate::models::did::IdentifierRecord;
use crate::models::event::{EventSink, RegistryEvent};
use crate::storage::{KeyValueStore, MemoryStore, StorageError};
use crate::utils::clock::Clock;
use crate::utils::validation::{require_identifier, require_location, require_principal};
use ethers_core::types::{Address, H256};
use log::{debug, error, info};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type IdentifierTable = Arc<dyn KeyValueStore<String, IdentifierRecord>>;
pub type ControllerIndex = Arc<dyn KeyValueStore<Address, String>>;

/// Identifier registry over injected storage.
pub struct IdentifierRegistry {
    records: IdentifierTable,
    controllers: ControllerIndex,
    clock: Arc<dyn Clock>,
    /// Serializes mutations; queries hold the read side.
    gate: RwLock<()>,
}

impl IdentifierRegistry {
    /// Creates a registry over the given tables.
    ///
    /// # Arguments
    /// * `records` - Primary table keyed by identifier
    /// * `controllers` - Reverse index keyed by controller
    /// * `clock` - Source of `registered_at`/`updated_at` timestamps
    ///
    /// The two tables must belong together: pairing a populated record table
    /// with an empty index breaks the one-identifier-per-controller rule.
    pub fn new(records: IdentifierTable, controllers: ControllerIndex, clock: Arc<dyn Clock>) -> Self {
        IdentifierRegistry {
            records,
            controllers,
            clock,
            gate: RwLock::new(()),
        }
    }

    /// Registry backed by fresh in-memory tables.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(MemoryStore::<String, IdentifierRecord>::new()),
            Arc::new(MemoryStore::<Address, String>::new()),
            clock,
        )
    }

    fn read_gate(&self) -> Result<RwLockReadGuard<'_, ()>, RegistryError> {
        self.gate.read().map_err(|_| StorageError::LockPoisoned.into())
    }

    fn write_gate(&self) -> Result<RwLockWriteGuard<'_, ()>, RegistryError> {
        self.gate.write().map_err(|_| StorageError::LockPoisoned.into())
    }

    // =====================
    // Mutations
    // =====================

    /// Registers `identifier` with the caller as controller.
    ///
    /// # Arguments
    /// * `caller` - Principal submitting the registration, becomes controller
    /// * `identifier` - Identifier string, e.g. `did:ex:abc`
    /// * `document_hash` - Digest of the initial document
    /// * `document_location` - Where the document can be fetched
    /// * `events` - Receives `IdentifierRegistered` on success
    ///
    /// # Errors
    /// - `EmptyIdentifier` / `EmptyLocation` / `ZeroAddress` for bad arguments
    /// - `IdentifierAlreadyExists` if the identifier is taken, whoever asks
    /// - `AlreadyHasIdentifier` if the caller already controls one
    pub fn register(
        &self,
        caller: Address,
        identifier: &str,
        document_hash: H256,
        document_location: &str,
        events: &dyn EventSink,
    ) -> Result<IdentifierRecord, RegistryError> {
        require_identifier(identifier)?;
        require_location(document_location)?;
        require_principal(caller)?;

        let _gate = self.write_gate()?;
        let key = identifier.to_string();

        if self.records.contains(&key)? {
            return Err(RegistryError::IdentifierAlreadyExists(key));
        }
        if let Some(existing) = self.controllers.get(&caller)? {
            return Err(RegistryError::AlreadyHasIdentifier {
                controller: caller,
                identifier: existing,
            });
        }

        let now = self.clock.now();
        let record = IdentifierRecord {
            identifier: key.clone(),
            controller: caller,
            document_hash,
            document_location: document_location.to_string(),
            registered_at: now,
            updated_at: now,
        };

        if !self.records.compare_and_swap(&key, None, Some(record.clone()))? {
            return Err(RegistryError::IdentifierAlreadyExists(key));
        }
        match self.controllers.compare_and_swap(&caller, None, Some(key.clone())) {
            Ok(true) => {}
            Ok(false) => {
                self.undo_record(&key, None);
                let existing = self.controllers.get(&caller)?.unwrap_or_default();
                return Err(RegistryError::AlreadyHasIdentifier {
                    controller: caller,
                    identifier: existing,
                });
            }
            Err(e) => {
                self.undo_record(&key, None);
                return Err(e.into());
            }
        }

        info!("registered identifier {} for {:?}", key, caller);
        events.emit(RegistryEvent::IdentifierRegistered {
            identifier: key,
            controller: caller,
            document_hash,
            document_location: record.document_location.clone(),
            timestamp: now,
        });
        Ok(record)
    }

    /// Replaces the document hash and location of an identifier in one step.
    ///
    /// # Errors
    /// - `EmptyLocation` if `new_location` is blank
    /// - `IdentifierNotFound` if the identifier is not registered
    /// - `Unauthorized` if `caller` is not the current controller
    pub fn update_document(
        &self,
        caller: Address,
        identifier: &str,
        new_hash: H256,
        new_location: &str,
        events: &dyn EventSink,
    ) -> Result<IdentifierRecord, RegistryError> {
        require_location(new_location)?;

        let _gate = self.write_gate()?;
        let current = self.controlled_record(caller, identifier)?;

        let now = self.clock.now();
        let updated = IdentifierRecord {
            document_hash: new_hash,
            document_location: new_location.to_string(),
            updated_at: now,
            ..current.clone()
        };
        self.records.put(updated.identifier.clone(), updated.clone())?;

        debug!(
            "document for {} moved {:?} -> {:?}",
            updated.identifier, current.document_hash, new_hash
        );
        events.emit(RegistryEvent::DocumentUpdated {
            identifier: updated.identifier.clone(),
            controller: caller,
            old_hash: current.document_hash,
            new_hash,
            document_location: updated.document_location.clone(),
            timestamp: now,
        });
        Ok(updated)
    }

    /// Hands control of an identifier to `new_controller`.
    ///
    /// The reverse index entry moves with the record. Transferring to the
    /// current controller is accepted and only refreshes `updated_at`.
    ///
    /// # Errors
    /// - `ZeroAddress` if `new_controller` is the zero address
    /// - `IdentifierNotFound` if the identifier is not registered
    /// - `Unauthorized` if `caller` is not the current controller
    /// - `TargetAlreadyHasIdentifier` if `new_controller` controls another identifier
    pub fn transfer_ownership(
        &self,
        caller: Address,
        identifier: &str,
        new_controller: Address,
        events: &dyn EventSink,
    ) -> Result<IdentifierRecord, RegistryError> {
        require_principal(new_controller)?;

        let _gate = self.write_gate()?;
        let current = self.controlled_record(caller, identifier)?;
        let key = current.identifier.clone();
        let moving = new_controller != caller;

        if moving {
            if let Some(other) = self.controllers.get(&new_controller)? {
                return Err(RegistryError::TargetAlreadyHasIdentifier {
                    controller: new_controller,
                    identifier: other,
                });
            }
        }

        let now = self.clock.now();
        let updated = IdentifierRecord {
            controller: new_controller,
            updated_at: now,
            ..current.clone()
        };
        self.records.put(key.clone(), updated.clone())?;

        if moving {
            match self.controllers.compare_and_swap(&new_controller, None, Some(key.clone())) {
                Ok(true) => {}
                Ok(false) => {
                    self.undo_record(&key, Some(current));
                    let other = self.controllers.get(&new_controller)?.unwrap_or_default();
                    return Err(RegistryError::TargetAlreadyHasIdentifier {
                        controller: new_controller,
                        identifier: other,
                    });
                }
                Err(e) => {
                    self.undo_record(&key, Some(current));
                    return Err(e.into());
                }
            }

            let released = match self.controllers.compare_and_swap(&caller, Some(&key), None) {
                Ok(true) => Ok(()),
                Ok(false) => Err(StorageError::Conflict(format!("controller index entry for {:?}", caller))),
                Err(e) => Err(e),
            };
            if let Err(e) = released {
                error!("failed to release index entry for {:?}: {}", caller, e);
                if let Err(undo) = self.controllers.compare_and_swap(&new_controller, Some(&key), None) {
                    error!("failed to undo index entry for {:?}: {}", new_controller, undo);
                }
                self.undo_record(&key, Some(current));
                return Err(e.into());
            }
        }

        info!("transferred {} from {:?} to {:?}", key, caller, new_controller);
        events.emit(RegistryEvent::OwnershipTransferred {
            identifier: key,
            previous_controller: caller,
            new_controller,
            timestamp: now,
        });
        Ok(updated)
    }

    /// Loads the record and checks that `caller` controls it.
    fn controlled_record(&self, caller: Address, identifier: &str) -> Result<IdentifierRecord, RegistryError> {
        let current = self
            .records
            .get(&identifier.to_string())?
            .ok_or_else(|| RegistryError::IdentifierNotFound(identifier.to_string()))?;

        if !current.is_controlled_by(caller) {
            return Err(RegistryError::Unauthorized {
                caller,
                required: current.controller,
            });
        }
        Ok(current)
    }

    /// Restores a record after a later step of the same mutation failed.
    fn undo_record(&self, key: &String, previous: Option<IdentifierRecord>) {
        let result = match previous {
            Some(record) => self.records.put(key.clone(), record),
            None => self.records.get(key).and_then(|written| match written {
                Some(written) => self.records.compare_and_swap(key, Some(&written), None).map(|_| ()),
                None => Ok(()),
            }),
        };
        if let Err(e) = result {
            error!("failed to roll back record {}: {}", key, e);
        }
    }

    // =====================
    // Queries
    // =====================

    /// Resolves an identifier to its full record; `None` if never registered.
    pub fn resolve(&self, identifier: &str) -> Result<Option<IdentifierRecord>, RegistryError> {
        let _gate = self.read_gate()?;
        Ok(self.records.get(&identifier.to_string())?)
    }

    /// Identifier controlled by `controller`, if any.
    pub fn identifier_of(&self, controller: Address) -> Result<Option<String>, RegistryError> {
        let _gate = self.read_gate()?;
        Ok(self.controllers.get(&controller)?)
    }

    pub fn exists(&self, identifier: &str) -> Result<bool, RegistryError> {
        let _gate = self.read_gate()?;
        Ok(self.records.contains(&identifier.to_string())?)
    }

    pub fn has_identifier(&self, controller: Address) -> Result<bool, RegistryError> {
        let _gate = self.read_gate()?;
        Ok(self.controllers.contains(&controller)?)
    }

    /// Number of registered identifiers.
    pub fn count(&self) -> Result<usize, RegistryError> {
        let _gate = self.read_gate()?;
        Ok(self.records.len()?)
    }
}
