// src/contracts/credential_registry.rs
//! Credential registry.
//!
//! An append-mostly ledger of credential hashes. The principal that registers
//! a hash becomes its issuer and is the only one who can later revoke it.
//! Verifiers use it for O(1) revocation checks without contacting the issuer.

use crate::contracts::error::RegistryError;
use crate::models::credential::CredentialRecord;
use crate::models::event::{EventSink, RegistryEvent};
use crate::storage::{KeyValueStore, MemoryStore, StorageError};
use crate::utils::clock::Clock;
use crate::utils::validation::require_principal;
use ethers_core::types::{Address, H256};
use log::info;
use std::sync::{Arc, RwLock};

pub type CredentialTable = Arc<dyn KeyValueStore<H256, CredentialRecord>>;

/// Credential status registry over injected storage.
pub struct CredentialRegistry {
    records: CredentialTable,
    clock: Arc<dyn Clock>,
    gate: RwLock<()>,
}

impl CredentialRegistry {
    pub fn new(records: CredentialTable, clock: Arc<dyn Clock>) -> Self {
        CredentialRegistry {
            records,
            clock,
            gate: RwLock::new(()),
        }
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(Arc::new(MemoryStore::<H256, CredentialRecord>::new()), clock)
    }

    /// Records a newly issued credential with the caller as issuer.
    ///
    /// # Errors
    /// - `ZeroAddress` if `caller` is the zero address
    /// - `CredentialAlreadyRegistered` if the hash is already known
    pub fn register(
        &self,
        caller: Address,
        credential_hash: H256,
        events: &dyn EventSink,
    ) -> Result<CredentialRecord, RegistryError> {
        require_principal(caller)?;
        let _gate = self.gate.write().map_err(|_| StorageError::LockPoisoned)?;

        let record = CredentialRecord {
            credential_hash,
            issuer: caller,
            revoked: false,
            registered_at: self.clock.now(),
        };
        if !self.records.compare_and_swap(&credential_hash, None, Some(record.clone()))? {
            return Err(RegistryError::CredentialAlreadyRegistered(credential_hash));
        }

        info!("credential {:?} registered by {:?}", credential_hash, caller);
        events.emit(RegistryEvent::CredentialRegistered {
            credential_hash,
            issuer: caller,
            timestamp: record.registered_at,
        });
        Ok(record)
    }

    /// Marks a credential as revoked. Irreversible.
    ///
    /// # Errors
    /// - `CredentialNotFound` if the hash was never registered
    /// - `Unauthorized` if `caller` is not the issuer
    /// - `AlreadyRevoked` if the credential is already revoked
    pub fn revoke(
        &self,
        caller: Address,
        credential_hash: H256,
        events: &dyn EventSink,
    ) -> Result<CredentialRecord, RegistryError> {
        let _gate = self.gate.write().map_err(|_| StorageError::LockPoisoned)?;

        let current = self
            .records
            .get(&credential_hash)?
            .ok_or(RegistryError::CredentialNotFound(credential_hash))?;
        if current.issuer != caller {
            return Err(RegistryError::Unauthorized {
                caller,
                required: current.issuer,
            });
        }
        if current.revoked {
            return Err(RegistryError::AlreadyRevoked(credential_hash));
        }

        let revoked = CredentialRecord {
            revoked: true,
            ..current.clone()
        };
        if !self
            .records
            .compare_and_swap(&credential_hash, Some(&current), Some(revoked.clone()))?
        {
            // Only reachable if the table is shared with a writer outside this registry.
            return Err(RegistryError::AlreadyRevoked(credential_hash));
        }

        info!("credential {:?} revoked by {:?}", credential_hash, caller);
        events.emit(RegistryEvent::CredentialRevoked {
            credential_hash,
            issuer: caller,
            timestamp: self.clock.now(),
        });
        Ok(revoked)
    }

    /// `true` only for registered and revoked credentials.
    ///
    /// Unknown hashes also report `false`: absence of revocation is not proof
    /// of issuance, use [`exists`](Self::exists) or [`get`](Self::get) for that.
    pub fn is_revoked(&self, credential_hash: H256) -> Result<bool, RegistryError> {
        Ok(self.get(credential_hash)?.map_or(false, |record| record.revoked))
    }

    pub fn exists(&self, credential_hash: H256) -> Result<bool, RegistryError> {
        let _gate = self.gate.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(self.records.contains(&credential_hash)?)
    }

    pub fn get(&self, credential_hash: H256) -> Result<Option<CredentialRecord>, RegistryError> {
        let _gate = self.gate.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(self.records.get(&credential_hash)?)
    }

    pub fn count(&self) -> Result<usize, RegistryError> {
        let _gate = self.gate.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(self.records.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::error::ErrorKind;
    use crate::utils::clock::ManualClock;
    use std::sync::Mutex;

    fn setup() -> (CredentialRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(500));
        (CredentialRegistry::in_memory(clock.clone()), clock)
    }

    #[test]
    fn test_register_sets_issuer_and_time() {
        let (registry, _) = setup();
        let issuer = Address::repeat_byte(0x11);
        let hash = H256::repeat_byte(0xcc);

        registry.register(issuer, hash, &()).unwrap();

        let record = registry.get(hash).unwrap().expect("record");
        assert_eq!(record.issuer, issuer);
        assert!(!record.revoked);
        assert_eq!(record.registered_at, 500);
        assert!(registry.exists(hash).unwrap());
    }

    #[test]
    fn test_second_registration_rejected() {
        let (registry, _) = setup();
        let hash = H256::repeat_byte(0xcc);
        registry.register(Address::repeat_byte(0x11), hash, &()).unwrap();

        let err = registry.register(Address::repeat_byte(0x22), hash, &()).unwrap_err();
        assert!(matches!(err, RegistryError::CredentialAlreadyRegistered(h) if h == hash));
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        // Issuer unchanged
        assert_eq!(registry.get(hash).unwrap().unwrap().issuer, Address::repeat_byte(0x11));
    }

    #[test]
    fn test_unknown_hash() {
        let (registry, _) = setup();
        let hash = H256::repeat_byte(0x99);
        assert!(!registry.is_revoked(hash).unwrap());
        assert!(!registry.exists(hash).unwrap());
        assert!(registry.get(hash).unwrap().is_none());

        let err = registry.revoke(Address::repeat_byte(0x11), hash, &()).unwrap_err();
        assert!(matches!(err, RegistryError::CredentialNotFound(_)));
    }

    #[test]
    fn test_zero_address_cannot_issue() {
        let (registry, _) = setup();
        let err = registry.register(Address::zero(), H256::repeat_byte(0xcc), &()).unwrap_err();
        assert!(matches!(err, RegistryError::ZeroAddress));
        assert_eq!(registry.count().unwrap(), 0);
    }

    #[test]
    fn test_revocation_scenario() {
        let (registry, clock) = setup();
        let (i, j) = (Address::repeat_byte(0x11), Address::repeat_byte(0x22));
        let hash = H256::repeat_byte(0xcc);
        let events: Mutex<Vec<RegistryEvent>> = Mutex::new(Vec::new());

        registry.register(i, hash, &events).unwrap();
        assert!(!registry.is_revoked(hash).unwrap());

        let err = registry.revoke(j, hash, &events).unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { caller, required } if caller == j && required == i));
        assert!(!registry.is_revoked(hash).unwrap());

        clock.advance(60);
        registry.revoke(i, hash, &events).unwrap();
        assert!(registry.is_revoked(hash).unwrap());

        let err = registry.revoke(i, hash, &events).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRevoked(_)));
        assert!(registry.is_revoked(hash).unwrap());

        // Registration time survives revocation
        assert_eq!(registry.get(hash).unwrap().unwrap().registered_at, 500);

        let events = events.into_inner().unwrap();
        assert_eq!(
            events,
            vec![
                RegistryEvent::CredentialRegistered { credential_hash: hash, issuer: i, timestamp: 500 },
                RegistryEvent::CredentialRevoked { credential_hash: hash, issuer: i, timestamp: 560 },
            ]
        );
    }

    #[test]
    fn test_revoked_credential_cannot_be_reregistered() {
        let (registry, _) = setup();
        let issuer = Address::repeat_byte(0x11);
        let hash = H256::repeat_byte(0xcc);
        registry.register(issuer, hash, &()).unwrap();
        registry.revoke(issuer, hash, &()).unwrap();

        let err = registry.register(issuer, hash, &()).unwrap_err();
        assert!(matches!(err, RegistryError::CredentialAlreadyRegistered(_)));
        assert!(registry.is_revoked(hash).unwrap());
    }
}
