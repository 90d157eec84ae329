use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use super::types::{ChainId, ChainType, WalletType};

/// Slot holding the last known wallet session
pub const WALLET_STATE_KEY: &str = "wallet-connector-wallet-state";

/// Sessions stay restorable for this long after the last write
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 6;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not find a data directory")]
    NoDataDir,
}

/// Keyed string storage backing the session slot
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory
pub struct FileStore {
    storage_path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `storage_dir`, creating the directory if needed
    pub fn new(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_path = storage_dir.as_ref().to_path_buf();

        if !storage_path.exists() {
            std::fs::create_dir_all(&storage_path)?;
        }

        Ok(Self { storage_path })
    }

    /// Default location under the user's local data directory
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let base = dirs::data_local_dir().ok_or(StoreError::NoDataDir)?;
        Ok(base.join("wallet-connector"))
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.storage_path.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.file_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        std::fs::write(self.file_path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.file_path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpiringEntry {
    value: String,
    expire_date: DateTime<Utc>,
}

/// Persisted wallet session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub chain_id: Option<ChainId>,
    #[serde(default)]
    pub chain_type: Option<ChainType>,
    #[serde(default)]
    pub wallet_type: Option<WalletType>,
}

impl SessionRecord {
    /// Every field needed to reconnect is present
    pub fn is_complete(&self) -> bool {
        !self.address.is_empty()
            && self.chain_id.is_some()
            && self.chain_type.is_some()
            && self.wallet_type.is_some()
    }
}

/// Result of reading the session slot
#[derive(Debug, Clone, PartialEq)]
pub enum SessionLookup {
    Empty,
    Expired,
    /// Present but not decodable as a session record
    Malformed,
    Found(SessionRecord),
}

/// Time-boxed session slot over a [`KeyValueStore`]
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: WALLET_STATE_KEY.to_string(),
            ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Write the record; the expiry restarts from now
    pub fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let entry = ExpiringEntry {
            value: serde_json::to_string(record)?,
            expire_date: Utc::now() + self.ttl,
        };
        self.store.set(&self.key, serde_json::to_string(&entry)?)
    }

    /// Read the slot. An expired record is reported but left in place.
    pub fn load(&self) -> Result<SessionLookup, StoreError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(SessionLookup::Empty);
        };

        let entry: ExpiringEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("discarding unreadable session entry: {}", e);
                return Ok(SessionLookup::Empty);
            }
        };

        if entry.expire_date < Utc::now() {
            return Ok(SessionLookup::Expired);
        }

        if entry.value.is_empty() {
            return Ok(SessionLookup::Empty);
        }

        Ok(match serde_json::from_str::<SessionRecord>(&entry.value) {
            Ok(record) => SessionLookup::Found(record),
            Err(_) => SessionLookup::Malformed,
        })
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key)
    }
}
