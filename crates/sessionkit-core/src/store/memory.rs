use std::sync::Mutex;

use crate::error::StorageError;

use super::{Retention, StoredToken, TokenStore};

#[derive(Debug, Default)]
struct Slots {
    persistent: Option<StoredToken>,
    ephemeral: Option<StoredToken>,
}

/// In-process token store holding both retention classes.
///
/// Nothing outlives the process, so `Persistent` only differs from
/// `Ephemeral` in how the token is tagged. Useful for tests and embedders
/// that manage persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slots: Mutex<Slots>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token, as if left behind by an earlier run.
    pub fn with_token(stored: StoredToken) -> Self {
        let store = Self::default();
        if let Ok(mut slots) = store.slots.lock() {
            match stored.retention {
                Retention::Persistent => slots.persistent = Some(stored),
                Retention::Ephemeral => slots.ephemeral = Some(stored),
            }
        }
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<StoredToken>, StorageError> {
        let slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(slots.ephemeral.clone().or_else(|| slots.persistent.clone()))
    }

    fn set(&self, token: &str, retention: Retention) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        let stored = Some(StoredToken::new(token, retention));
        match retention {
            Retention::Persistent => {
                slots.persistent = stored;
                slots.ephemeral = None;
            }
            Retention::Ephemeral => {
                slots.ephemeral = stored;
                slots.persistent = None;
            }
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        *slots = Slots::default();
        Ok(())
    }

    fn clear_if(&self, expected: &str) -> Result<bool, StorageError> {
        let mut slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        let current = slots.ephemeral.as_ref().or(slots.persistent.as_ref());
        if current.map(|s| s.token.as_str()) != Some(expected) {
            return Ok(false);
        }
        *slots = Slots::default();
        Ok(true)
    }
}
