use crate::StoreError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Origin-scoped key-value store holding the persisted auth payload.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Store backed by the platform keychain, one service name per origin.
#[derive(Debug, Clone)]
pub struct KeychainStore {
    service_name: String,
}

impl KeychainStore {
    pub fn for_origin(origin: &str) -> Self {
        Self {
            service_name: format!("io.courier.session:{origin}"),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl SessionStore for KeychainStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entry = keyring::Entry::new(&self.service_name, key)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let entry = keyring::Entry::new(&self.service_name, key)?;
        entry.set_password(value)?;
        Ok(())
    }
}

/// In-process store. Clones share the same entries, so two clones behave
/// like two tabs of one origin.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
