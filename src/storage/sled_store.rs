//! `sled`-backed session storage

use super::KeyValueStore;
use crate::error::{Result, TablechatError};
use sled::Db;
use std::path::Path;

/// Durable key-value backend using an embedded `sled` database
///
/// Every write is flushed before returning, matching the synchronous
/// write-through behaviour the session store relies on.
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create a store at `path`
    ///
    /// # Errors
    ///
    /// Returns `TablechatError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use tablechat::storage::{KeyValueStore, SledStore};
    ///
    /// # fn main() -> tablechat::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledStore::open(dir.path().join("sessions.db"))?;
    /// store.set("chat_sessions", "[]")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| TablechatError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .get(key.as_bytes())
            .map_err(|e| TablechatError::Storage(format!("Get failed: {}", e)))?;

        match value {
            Some(bytes) => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    TablechatError::Storage(format!("Value for {} is not UTF-8: {}", key, e))
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| TablechatError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| TablechatError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| TablechatError::Storage(format!("Remove failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| TablechatError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }
}
