use std::sync::Mutex;

use tracing::debug;

use crate::error::StorageError;

use super::{Retention, StoredToken, TokenStore};

/// Durable home for a `Persistent` token.
pub trait DurableBackend: Send + Sync {
    fn load(&self) -> Result<Option<StoredToken>, StorageError>;
    fn save(&self, stored: &StoredToken) -> Result<(), StorageError>;
    fn remove(&self) -> Result<(), StorageError>;
}

/// Token store pairing an in-memory ephemeral slot with a durable backend.
///
/// The ephemeral mutex also serializes every durable operation, so
/// `clear_if` compares and removes without another writer slipping in.
pub struct TokenVault {
    ephemeral: Mutex<Option<StoredToken>>,
    durable: Box<dyn DurableBackend>,
}

impl TokenVault {
    pub fn new(durable: Box<dyn DurableBackend>) -> Self {
        Self {
            ephemeral: Mutex::new(None),
            durable,
        }
    }
}

impl TokenStore for TokenVault {
    fn get(&self) -> Result<Option<StoredToken>, StorageError> {
        let ephemeral = self.ephemeral.lock().map_err(|_| StorageError::Poisoned)?;
        if let Some(ref stored) = *ephemeral {
            return Ok(Some(stored.clone()));
        }
        self.durable.load()
    }

    fn set(&self, token: &str, retention: Retention) -> Result<(), StorageError> {
        let mut ephemeral = self.ephemeral.lock().map_err(|_| StorageError::Poisoned)?;
        let stored = StoredToken::new(token, retention);
        match retention {
            Retention::Persistent => {
                self.durable.save(&stored)?;
                *ephemeral = None;
            }
            Retention::Ephemeral => {
                self.durable.remove()?;
                *ephemeral = Some(stored);
            }
        }
        debug!(?retention, "Token written");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut ephemeral = self.ephemeral.lock().map_err(|_| StorageError::Poisoned)?;
        *ephemeral = None;
        self.durable.remove()
    }

    fn clear_if(&self, expected: &str) -> Result<bool, StorageError> {
        let mut ephemeral = self.ephemeral.lock().map_err(|_| StorageError::Poisoned)?;
        let matches = match *ephemeral {
            Some(ref stored) => stored.token == expected,
            None => self
                .durable
                .load()?
                .map(|stored| stored.token == expected)
                .unwrap_or(false),
        };
        if !matches {
            return Ok(false);
        }
        *ephemeral = None;
        self.durable.remove()?;
        Ok(true)
    }
}
