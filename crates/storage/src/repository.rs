use async_trait::async_trait;
use memorizer_core::session::SessionSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key under which the session record is stored.
pub const STORAGE_KEY: &str = "spotify-music-memorizer-storage";

/// Envelope version written by this build.
pub const STORAGE_VERSION: u32 = 0;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported record version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Persisted shape of the session: the snapshot wrapped in a versioned envelope.
///
/// Encodes as `{"state": {...}, "version": 0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub state: SessionSnapshot,
    pub version: u32,
}

impl PersistedSession {
    #[must_use]
    pub fn new(state: SessionSnapshot) -> Self {
        Self {
            state,
            version: STORAGE_VERSION,
        }
    }

    /// Serialize the envelope to its JSON text form.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the snapshot cannot be encoded.
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Parse an envelope from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed JSON and
    /// `StorageError::UnsupportedVersion` for envelopes written by another version.
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        let envelope: Self =
            serde_json::from_str(raw).map_err(|err| StorageError::Serialization(err.to_string()))?;
        if envelope.version != STORAGE_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: envelope.version,
                expected: STORAGE_VERSION,
            });
        }
        Ok(envelope)
    }
}

/// Repository contract for the persisted session record.
#[async_trait]
pub trait SessionStateRepository: Send + Sync {
    /// Fetch the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read or decoded.
    async fn load_state(&self, key: &str) -> Result<Option<SessionSnapshot>, StorageError>;

    /// Persist or replace the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be encoded or stored.
    async fn save_state(&self, key: &str, snapshot: &SessionSnapshot) -> Result<(), StorageError>;

    /// Remove the record under `key`. Removing a missing record is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the delete.
    async fn clear_state(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Records are kept in their encoded JSON form so the envelope path is exercised.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Raw JSON stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    /// Store raw JSON under `key`, bypassing encoding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_raw(&self, key: &str, raw: impl Into<String>) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), raw.into());
        Ok(())
    }
}

#[async_trait]
impl SessionStateRepository for InMemoryRepository {
    async fn load_state(&self, key: &str) -> Result<Option<SessionSnapshot>, StorageError> {
        self.raw(key)?
            .map(|raw| PersistedSession::from_json(&raw).map(|envelope| envelope.state))
            .transpose()
    }

    async fn save_state(&self, key: &str, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let raw = PersistedSession::new(snapshot.clone()).to_json()?;
        self.insert_raw(key, raw)
    }

    async fn clear_state(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionStateRepository>,
}
