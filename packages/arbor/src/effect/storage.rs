//! Key-value storage effects and the store seam.
//!
//! Two named areas exist: `local` (persistent) and `session` (dropped with
//! the environment). Each is a [`KeyValueStore`]; [`MemoryStore`] keeps data
//! in memory, [`JsonFileStore`] mirrors every write to a JSON file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::Effect;

// =============================================================================
// Operations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    Local,
    Session,
}

impl StorageArea {
    pub const ALL: [StorageArea; 2] = [StorageArea::Local, StorageArea::Session];
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageArea::Local => f.write_str("local"),
            StorageArea::Session => f.write_str("session"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageOp {
    Set {
        area: StorageArea,
        key: String,
        value: String,
    },
    Get {
        area: StorageArea,
        key: String,
    },
    Remove {
        area: StorageArea,
        key: String,
    },
    Clear {
        area: StorageArea,
    },
    Unknown {
        operation: String,
        payload: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Set,
    Get,
    Remove,
    Clear,
}

impl Verb {
    const ALL: [Verb; 4] = [Verb::Set, Verb::Get, Verb::Remove, Verb::Clear];
}

fn operation_name(verb: Verb, area: StorageArea) -> &'static str {
    match (verb, area) {
        (Verb::Set, StorageArea::Local) => "setLocalStorage",
        (Verb::Get, StorageArea::Local) => "getLocalStorage",
        (Verb::Remove, StorageArea::Local) => "removeLocalStorage",
        (Verb::Clear, StorageArea::Local) => "clearLocalStorage",
        (Verb::Set, StorageArea::Session) => "setSessionStorage",
        (Verb::Get, StorageArea::Session) => "getSessionStorage",
        (Verb::Remove, StorageArea::Session) => "removeSessionStorage",
        (Verb::Clear, StorageArea::Session) => "clearSessionStorage",
    }
}

#[derive(Deserialize)]
struct KeyPayload {
    key: String,
}

#[derive(Deserialize)]
struct SetPayload {
    key: String,
    value: Value,
}

/// Stored values are text; non-string JSON values are stored encoded.
fn stored_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl StorageOp {
    pub fn operation(&self) -> &str {
        match self {
            StorageOp::Set { area, .. } => operation_name(Verb::Set, *area),
            StorageOp::Get { area, .. } => operation_name(Verb::Get, *area),
            StorageOp::Remove { area, .. } => operation_name(Verb::Remove, *area),
            StorageOp::Clear { area } => operation_name(Verb::Clear, *area),
            StorageOp::Unknown { operation, .. } => operation,
        }
    }

    pub fn area(&self) -> Option<StorageArea> {
        match self {
            StorageOp::Set { area, .. }
            | StorageOp::Get { area, .. }
            | StorageOp::Remove { area, .. }
            | StorageOp::Clear { area } => Some(*area),
            StorageOp::Unknown { .. } => None,
        }
    }

    pub(crate) fn decode(operation: &str, payload: Value) -> Self {
        let found = Verb::ALL.iter().find_map(|verb| {
            StorageArea::ALL
                .iter()
                .find(|area| operation_name(*verb, **area) == operation)
                .map(|area| (*verb, *area))
        });
        let Some((verb, area)) = found else {
            return Self::unknown(operation, payload);
        };

        let decoded = match verb {
            Verb::Set => serde_json::from_value::<SetPayload>(payload.clone()).map(|p| {
                StorageOp::Set {
                    area,
                    key: p.key,
                    value: stored_text(p.value),
                }
            }),
            Verb::Get => serde_json::from_value::<KeyPayload>(payload.clone())
                .map(|p| StorageOp::Get { area, key: p.key }),
            Verb::Remove => serde_json::from_value::<KeyPayload>(payload.clone())
                .map(|p| StorageOp::Remove { area, key: p.key }),
            Verb::Clear => Ok(StorageOp::Clear { area }),
        };

        decoded.unwrap_or_else(|e| {
            debug!(operation, error = %e, "storage payload did not decode, keeping as unknown");
            Self::unknown(operation, payload)
        })
    }

    fn unknown(operation: &str, payload: Value) -> Self {
        StorageOp::Unknown {
            operation: operation.to_string(),
            payload,
        }
    }
}

pub fn set_local(key: impl Into<String>, value: impl Into<String>) -> Effect {
    set(StorageArea::Local, key, value)
}

pub fn get_local(key: impl Into<String>) -> Effect {
    get(StorageArea::Local, key)
}

pub fn remove_local(key: impl Into<String>) -> Effect {
    remove(StorageArea::Local, key)
}

pub fn clear_local() -> Effect {
    clear(StorageArea::Local)
}

pub fn set_session(key: impl Into<String>, value: impl Into<String>) -> Effect {
    set(StorageArea::Session, key, value)
}

pub fn get_session(key: impl Into<String>) -> Effect {
    get(StorageArea::Session, key)
}

pub fn remove_session(key: impl Into<String>) -> Effect {
    remove(StorageArea::Session, key)
}

pub fn clear_session() -> Effect {
    clear(StorageArea::Session)
}

pub fn set(area: StorageArea, key: impl Into<String>, value: impl Into<String>) -> Effect {
    Effect::new(StorageOp::Set {
        area,
        key: key.into(),
        value: value.into(),
    })
}

pub fn get(area: StorageArea, key: impl Into<String>) -> Effect {
    Effect::new(StorageOp::Get {
        area,
        key: key.into(),
    })
}

pub fn remove(area: StorageArea, key: impl Into<String>) -> Effect {
    Effect::new(StorageOp::Remove {
        area,
        key: key.into(),
    })
}

pub fn clear(area: StorageArea) -> Effect {
    Effect::new(StorageOp::Clear { area })
}

// =============================================================================
// Stores
// =============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("storage file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {path} is not a JSON string map: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// A string-to-string store.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    fn clear(&mut self) -> Result<(), StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store with an optional byte quota over keys plus values.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota: Some(quota),
        }
    }

    /// Bytes currently used.
    pub fn used(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn check_quota(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let Some(quota) = self.quota else {
            return Ok(());
        };
        let existing = self.entries.get(key).map_or(0, |v| key.len() + v.len());
        let needed = self.used() - existing + key.len() + value.len();
        if needed > quota {
            return Err(StoreError::QuotaExceeded { needed, quota });
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_quota(key, value)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A [`MemoryStore`] mirrored to a JSON file after every mutation.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open `path`, loading existing entries. A missing file starts empty.
    pub fn open(path: impl AsRef<Path>, quota: Option<usize>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        debug!(path = %path.display(), entries = entries.len(), "opened json store");
        Ok(Self {
            path,
            inner: MemoryStore { entries, quota },
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.inner.entries).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, bytes).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl JsonFileStore {
    /// Flush, or undo the in-memory mutation so memory matches the file.
    fn flush_or_restore(
        &mut self,
        undo: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StoreError> {
        let result = self.flush();
        if let Err(e) = &result {
            warn!(path = %self.path.display(), error = %e, "flush failed, rolling back");
            undo(&mut self.inner.entries);
        }
        result
    }
}

fn restore_entry(entries: &mut BTreeMap<String, String>, key: &str, previous: Option<String>) {
    match previous {
        Some(value) => entries.insert(key.to_string(), value),
        None => entries.remove(key),
    };
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self.inner.entries.get(key).cloned();
        self.inner.set(key, value)?;
        self.flush_or_restore(|entries| restore_entry(entries, key, previous))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let Some(previous) = self.inner.entries.remove(key) else {
            return Ok(());
        };
        self.flush_or_restore(|entries| restore_entry(entries, key, Some(previous)))
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let previous = std::mem::take(&mut self.inner.entries);
        self.flush_or_restore(|entries| *entries = previous)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// The two storage areas an environment exposes.
pub struct Storage {
    local: Box<dyn KeyValueStore>,
    session: Box<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(local: Box<dyn KeyValueStore>, session: Box<dyn KeyValueStore>) -> Self {
        Self { local, session }
    }

    /// Two empty in-memory areas sharing one quota setting.
    pub fn in_memory(quota: Option<usize>) -> Self {
        let store = || match quota {
            Some(q) => MemoryStore::with_quota(q),
            None => MemoryStore::new(),
        };
        Self::new(Box::new(store()), Box::new(store()))
    }

    pub fn area(&self, area: StorageArea) -> &dyn KeyValueStore {
        match area {
            StorageArea::Local => self.local.as_ref(),
            StorageArea::Session => self.session.as_ref(),
        }
    }

    pub fn area_mut(&mut self, area: StorageArea) -> &mut dyn KeyValueStore {
        match area {
            StorageArea::Local => self.local.as_mut(),
            StorageArea::Session => self.session.as_mut(),
        }
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("local", &self.local.len())
            .field("session", &self.session.len())
            .finish()
    }
}
