use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;

use crate::errors::StorageError;
use crate::storage::area::{LocalStore, StorageArea};

/// In-memory local storage (no persistence).
///
/// Areas can be given a byte quota (keys plus values, like browsers count
/// it) or be disabled entirely to mimic private browsing.
#[derive(Default)]
pub struct InMemoryLocalStore {
    areas: Mutex<HashMap<url::Origin, Arc<InMemoryLocalArea>>>,
    quota: Option<usize>,
    disabled: bool,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Areas refuse writes that would grow them beyond `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self { quota: Some(bytes), ..Self::default() }
    }

    /// Areas refuse every write.
    pub fn disabled() -> Self {
        Self { disabled: true, ..Self::default() }
    }
}

impl LocalStore for InMemoryLocalStore {
    fn area(&self, origin: &url::Origin) -> Result<Arc<dyn StorageArea>> {
        let mut guard = self.areas.lock().map_err(|_| StorageError::Poisoned)?;
        let area = guard
            .entry(origin.clone())
            .or_insert_with(|| {
                Arc::new(InMemoryLocalArea {
                    map: Mutex::default(),
                    quota: self.quota,
                    disabled: self.disabled,
                })
            })
            .clone();
        Ok(area)
    }
}

struct InMemoryLocalArea {
    map: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
    disabled: bool,
}

impl InMemoryLocalArea {
    fn map(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.map.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn used_bytes(map: &HashMap<String, String>) -> usize {
    map.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl StorageArea for InMemoryLocalArea {
    fn get_item(&self, key: &str) -> Option<String> {
        self.map().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.disabled {
            return Err(StorageError::Disabled.into());
        }
        let mut map = self.map()?;
        if let Some(quota) = self.quota {
            let replaced = map.get(key).map_or(0, |old| key.len() + old.len());
            let needed = used_bytes(&map) - replaced + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota }.into());
            }
        }
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.map()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.map()?.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.map().map(|m| m.len()).unwrap_or(0)
    }

    fn keys(&self) -> Vec<String> {
        let mut v: Vec<String> = self.map().map(|m| m.keys().cloned().collect()).unwrap_or_default();
        v.sort_unstable();
        v
    }
}
