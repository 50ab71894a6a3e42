//! Key-value storage for client state that must survive a restart.
//!
//! The trait is synchronous. The only state persisted today is the
//! active-chat set, written on every change and re-read on every lookup, so
//! values are small and the store is the source of truth.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use redb::{Database, DatabaseError, ReadableTable, TableDefinition, TableError};
use thiserror::Error;
use tracing::trace;

/// Table: session
/// Key: state key (e.g. `activeChats`)
/// Value: JSON text
const SESSION: TableDefinition<&str, &str> = TableDefinition::new("session");

const LOCK_RETRIES: u32 = 40;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(25);

/// Storage errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend I/O or transaction failure.
    #[error("storage i/o error: {0}")]
    Io(String),

    /// Value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Persistent string store keyed by name.
pub trait ChatStore: Send + Sync + 'static {
    /// Value stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`.
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store. Clones share state, so a clone handed to a second
/// [`crate::ActiveChats`] simulates a reload.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable store backed by Redb.
///
/// The database file is opened for each operation and closed again, so
/// several processes can share one state file. Redb holds an exclusive lock
/// while open; an operation that finds the file locked retries briefly.
#[derive(Debug, Clone)]
pub struct RedbStore {
    path: PathBuf,
}

impl RedbStore {
    /// Create the database at `path` if needed and check that it opens.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self { path: path.as_ref().to_path_buf() };

        let db = store.database()?;
        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(SESSION).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(store)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn database(&self) -> Result<Database, StoreError> {
        let mut attempt = 0;
        loop {
            match Database::create(&self.path) {
                Ok(db) => return Ok(db),
                Err(DatabaseError::DatabaseAlreadyOpen) if attempt < LOCK_RETRIES => {
                    attempt += 1;
                    trace!(path = %self.path.display(), attempt, "state file busy");
                    std::thread::sleep(LOCK_RETRY_DELAY);
                },
                Err(e) => return Err(StoreError::Io(e.to_string())),
            }
        }
    }
}

impl ChatStore for RedbStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let db = self.database()?;
        let txn = db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = match txn.open_table(SESSION) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        let value = table.get(key).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let db = self.database()?;
        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let mut table = txn.open_table(SESSION).map_err(|e| StoreError::Io(e.to_string()))?;
            table.insert(key, value).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }
}
