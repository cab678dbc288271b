//! JSON value stores.
//!
//! An entity keeps its id and traits in whichever store actually works on
//! the current page: cookies first, then local storage, then memory. All
//! three speak [`ValueStore`], so the entity never needs to know which one
//! it got. As with cookies, a value encoding to JSON `null` is a removal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::storage::StorageArea;

/// Key written and removed to check that local storage accepts writes.
pub const LOCAL_PROBE_KEY: &str = "__storejs__";

/// A JSON-safe key/value store that never fails loudly.
pub trait ValueStore: Send + Sync {
    /// Returns the value for `key`; missing or undecodable values are `None`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value`; `Value::Null` removes the key. `false` on failure.
    fn set(&self, key: &str, value: &Value) -> bool;

    /// Removes `key`. `false` on failure.
    fn remove(&self, key: &str) -> bool;
}

/// JSON view over a [`StorageArea`].
#[derive(Clone)]
pub struct LocalStorage {
    area: Arc<dyn StorageArea>,
}

impl LocalStorage {
    pub fn new(area: Arc<dyn StorageArea>) -> Self {
        Self { area }
    }

    pub fn area(&self) -> &Arc<dyn StorageArea> {
        &self.area
    }

    /// Returns `true` when a probe item can be written and read back.
    pub fn is_enabled(&self) -> bool {
        let enabled = self.area.set_item(LOCAL_PROBE_KEY, LOCAL_PROBE_KEY).is_ok()
            && self.area.get_item(LOCAL_PROBE_KEY).as_deref() == Some(LOCAL_PROBE_KEY);
        let _ = self.area.remove_item(LOCAL_PROBE_KEY);
        enabled
    }
}

impl ValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<Value> {
        let raw = self.area.get_item(key)?;
        match serde_json::from_str(&raw) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("local storage {key:?} is not JSON: {e}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &Value) -> bool {
        if value.is_null() {
            return self.remove(key);
        }
        let result = serde_json::to_string(value)
            .map_err(anyhow::Error::from)
            .and_then(|encoded| self.area.set_item(key, &encoded));
        match result {
            Ok(()) => true,
            Err(e) => {
                log::debug!("local storage set {key:?} failed: {e}");
                false
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        match self.area.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("local storage remove {key:?} failed: {e}");
                false
            }
        }
    }
}

/// Last-resort store that lives as long as the page.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn set(&self, key: &str, value: &Value) -> bool {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if value.is_null() {
            values.remove(key);
        } else {
            values.insert(key.to_string(), value.clone());
        }
        true
    }

    fn remove(&self, key: &str) -> bool {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::{InMemoryLocalStore, LocalStore};

    fn local(store: InMemoryLocalStore) -> LocalStorage {
        let origin = url::Url::parse("https://app.example.com").unwrap().origin();
        LocalStorage::new(store.area(&origin).unwrap())
    }

    #[test]
    fn local_storage_round_trips_json() {
        let ls = local(InMemoryLocalStore::new());
        let traits = json!({"name": "Acme", "employees": 120, "tags": ["b2b"]});

        assert!(ls.set("ajs_group_properties", &traits));
        assert_eq!(ls.get("ajs_group_properties"), Some(traits));
        assert_eq!(ls.area().get_item("ajs_group_properties").as_deref().map(|s| s.starts_with('{')), Some(true));
    }

    #[test]
    fn local_storage_null_removes() {
        let ls = local(InMemoryLocalStore::new());
        ls.set("k", &json!(1));
        assert!(ls.set("k", &Value::Null));
        assert!(ls.area().get_item("k").is_none());
    }

    #[test]
    fn local_storage_garbage_reads_as_none() {
        let ls = local(InMemoryLocalStore::new());
        ls.area().set_item("k", "{oops").unwrap();
        assert_eq!(ls.get("k"), None);
    }

    #[test]
    fn enabled_probe_leaves_nothing_behind() {
        let ls = local(InMemoryLocalStore::new());
        assert!(ls.is_enabled());
        assert!(ls.area().is_empty());

        assert!(!local(InMemoryLocalStore::disabled()).is_enabled());
    }

    #[test]
    fn quota_failure_reports_false() {
        let ls = local(InMemoryLocalStore::with_quota(16));
        assert!(!ls.set("traits", &json!({"a": "a long value that cannot fit"})));
        assert_eq!(ls.get("traits"), None);
    }

    #[test]
    fn memory_store_contract() {
        let m = MemoryStore::new();
        assert!(m.set("id", &json!("u1")));
        assert_eq!(m.get("id"), Some(json!("u1")));
        assert!(m.set("id", &Value::Null));
        assert_eq!(m.get("id"), None);
        assert!(m.remove("missing"));
    }
}
