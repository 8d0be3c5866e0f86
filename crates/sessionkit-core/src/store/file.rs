use std::path::PathBuf;

use crate::error::StorageError;

use super::{DurableBackend, StoredToken};

/// Token file name in the data directory
const TOKEN_FILE: &str = "token.json";

/// Persists the token as JSON in the data directory.
pub struct FileBackend {
    data_dir: PathBuf,
}

impl FileBackend {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn token_path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_FILE)
    }
}

impl DurableBackend for FileBackend {
    fn load(&self) -> Result<Option<StoredToken>, StorageError> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, stored: &StoredToken) -> Result<(), StorageError> {
        let path = self.token_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(stored)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
