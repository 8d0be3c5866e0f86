//! Storage for the current session token.
//!
//! Tokens are kept in one of two retention classes:
//! - `Persistent`: survives across runs (file or OS keychain)
//! - `Ephemeral`: lives only as long as the process
//!
//! At most one token is current. Writing to one class clears the other, and
//! `clear_if` lets a late freshness check discard a token only when it is
//! still the one the check was started against.

pub mod file;
pub mod keychain;
pub mod memory;
pub mod vault;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, TokenBackend};
use crate::error::StorageError;

pub use file::FileBackend;
pub use keychain::KeyringBackend;
pub use memory::MemoryTokenStore;
pub use vault::{DurableBackend, TokenVault};

/// How long a written token is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    Persistent,
    Ephemeral,
}

impl Retention {
    /// "Remember me" selects persistent storage; anything else is ephemeral.
    pub fn from_remember(remember: bool) -> Self {
        if remember {
            Retention::Persistent
        } else {
            Retention::Ephemeral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub retention: Retention,
    pub stored_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(token: impl Into<String>, retention: Retention) -> Self {
        Self {
            token: token.into(),
            retention,
            stored_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.stored_at
    }

    pub fn is_older_than(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }
}

/// Holder of the current session token.
///
/// Writers are the login submitter (`set`) and the session bootstrapper
/// (`clear_if`). Implementations serialize all operations internally.
#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    /// Current token, preferring the ephemeral class when both are present.
    fn get(&self) -> Result<Option<StoredToken>, StorageError>;

    /// Make `token` current in the given class, superseding any prior token.
    fn set(&self, token: &str, retention: Retention) -> Result<(), StorageError>;

    /// Drop the current token from both classes.
    fn clear(&self) -> Result<(), StorageError>;

    /// Clear only if the current token still equals `expected`.
    /// Returns whether anything was cleared.
    fn clear_if(&self, expected: &str) -> Result<bool, StorageError>;
}

/// Open the token store selected by the config, rooted at `data_dir`.
pub fn open_token_store(config: &Config, data_dir: &Path) -> Arc<dyn TokenStore> {
    let durable: Box<dyn DurableBackend> = match config.token_backend {
        TokenBackend::File => Box::new(FileBackend::new(data_dir.to_path_buf())),
        TokenBackend::Keyring => Box::new(KeyringBackend::new()),
    };
    Arc::new(TokenVault::new(durable))
}
