use keyring::Entry;

use crate::error::StorageError;

use super::{DurableBackend, StoredToken};

const SERVICE_NAME: &str = "sessionkit";
const ENTRY_NAME: &str = "session-token";

/// Persists the token in the OS keychain.
///
/// The whole `StoredToken` is serialized into the secret so the write time
/// travels with it.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, ENTRY_NAME)?)
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableBackend for KeyringBackend {
    fn load(&self) -> Result<Option<StoredToken>, StorageError> {
        match self.entry()?.get_password() {
            Ok(secret) => Ok(Some(serde_json::from_str(&secret)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, stored: &StoredToken) -> Result<(), StorageError> {
        let secret = serde_json::to_string(stored)?;
        self.entry()?.set_password(&secret)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
