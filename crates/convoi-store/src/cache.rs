//! Key-value cache: the primary, fast, offline-capable store.
//!
//! The cache is authoritative; the spreadsheet files are a convenience
//! export. Cache write failures are swallowed and logged so a storage
//! hiccup never blocks the user mid-form.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::StoreError;

pub const CLIENTS_KEY: &str = "clientsData";
pub const DRIVERS_KEY: &str = "driversData";
pub const CONVOYEURS_KEY: &str = "convoyeursData";
pub const PRODUCTS_KEY: &str = "productsData";
pub const HISTORY_KEY: &str = "declarationHistory";
pub const LAST_DOCNUM_KEY: &str = "lastDocumentNumber";
pub const EDITING_KEY: &str = "editingDeclarationId";
pub const CURRENT_KEY: &str = "currentDeclaration";

/// The host's key-value persistence seam.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Ephemeral in-process store, used when no cache directory is configured.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: HashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key under a cache directory.
#[derive(Debug)]
pub struct FsKvStore {
    dir: PathBuf,
}

impl FsKvStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for FsKvStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Typed access to the cache. Every write replaces the stored sequence for
/// its key whole; there is no incremental append.
pub struct CacheMirror {
    kv: Box<dyn KvStore>,
}

impl CacheMirror {
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Raw payload for a key, for cache-vs-spreadsheet precedence checks.
    pub fn payload(&self, key: &str) -> Option<String> {
        self.kv.get(key)
    }

    /// Stored records for `key`; empty when absent or unreadable.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(json) = self.kv.get(key) else {
            return Vec::new();
        };
        serde_json::from_str(&json).unwrap_or_else(|err| {
            warn!(key, %err, "unreadable cache entry");
            Vec::new()
        })
    }

    pub fn write<T: Serialize>(&mut self, key: &str, records: &[T]) {
        match serde_json::to_string(records) {
            Ok(json) => {
                if let Err(err) = self.kv.set(key, &json) {
                    warn!(key, %err, "cache write failed");
                }
            }
            Err(err) => warn!(key, %err, "cache serialization failed"),
        }
    }

    pub fn read_scalar(&self, key: &str) -> Option<String> {
        self.kv.get(key)
    }

    pub fn write_scalar(&mut self, key: &str, value: &str) {
        if let Err(err) = self.kv.set(key, value) {
            warn!(key, %err, "cache write failed");
        }
    }

    pub fn read_counter(&self, key: &str) -> u32 {
        self.kv
            .get(key)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn write_counter(&mut self, key: &str, value: u32) {
        self.write_scalar(key, &value.to_string());
    }

    pub fn remove(&mut self, key: &str) {
        if let Err(err) = self.kv.remove(key) {
            warn!(key, %err, "cache remove failed");
        }
    }
}
