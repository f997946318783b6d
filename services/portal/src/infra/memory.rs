use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::repository::KeyValueStore;
use crate::error::PortalError;

/// Process-local key-value store with a fixed byte quota, counted as key plus value length.
///
/// Cloning shares the same underlying map.
#[derive(Clone)]
pub struct MemoryKvStore {
    inner: Arc<Mutex<Entries>>,
    quota_bytes: u64,
}

#[derive(Default)]
struct Entries {
    map: BTreeMap<String, String>,
    used: u64,
}

fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

impl MemoryKvStore {
    pub fn new(quota_bytes: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Entries::default())),
            quota_bytes,
        }
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    /// Bytes currently held, by the same accounting the quota uses.
    pub fn used_bytes(&self) -> u64 {
        self.lock().used
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PortalError> {
        Ok(self.lock().map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PortalError> {
        let mut entries = self.lock();
        let replaced = entries.map.get(key).map_or(0, |old| entry_size(key, old));
        let used = entries.used - replaced + entry_size(key, value);
        if used > self.quota_bytes {
            return Err(PortalError::QuotaExceeded);
        }
        entries.map.insert(key.to_owned(), value.to_owned());
        entries.used = used;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PortalError> {
        let mut entries = self.lock();
        if let Some(old) = entries.map.remove(key) {
            entries.used -= entry_size(key, &old);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, PortalError> {
        Ok(self.lock().map.keys().cloned().collect())
    }
}
