//! Id and traits bookkeeping over cookies and local storage.
//!
//! At construction the entity picks its primary store: cookies when a probe
//! cookie round-trips, otherwise local storage when it accepts writes,
//! otherwise memory. The id lives in the primary store and is mirrored into
//! local storage (unless disabled) so it can be restored when the cookie is
//! lost. Traits always live in local storage.
//!
//! With `persist = false` nothing is written anywhere; id and traits are
//! kept on the entity itself.

use std::sync::Arc;

use serde_json::Value;

use crate::cookies::{is_truthy, CookieStore};
use crate::entity::{Entity, EntityOptions, EntityOverrides, Traits};
use crate::storage::{LocalStorage, MemoryStore, ValueStore};

/// Disposable cookie used to decide whether cookies work at all.
pub const COOKIE_PROBE_KEY: &str = "ajs:cookies";

pub struct PersistentEntity {
    /// Entity name, for logging.
    name: &'static str,
    defaults: EntityOptions,
    options: EntityOptions,
    /// Primary store for the id.
    storage: Arc<dyn ValueStore>,
    /// Store for traits and the id backup.
    local: Arc<dyn ValueStore>,
    /// In-memory id and traits, used when `persist` is off.
    id: Option<String>,
    traits: Traits,
}

impl PersistentEntity {
    /// Creates an entity over a negotiated cookie store and a local storage
    /// area, choosing the primary store as described in the module docs.
    pub fn new(
        name: &'static str,
        defaults: EntityOptions,
        overrides: &EntityOverrides,
        cookies: Arc<CookieStore>,
        local: LocalStorage,
    ) -> Self {
        let local: Arc<dyn ValueStore> = if local.is_enabled() {
            Arc::new(local)
        } else {
            log::debug!("{name}: local storage unavailable, keeping traits in memory");
            Arc::new(MemoryStore::new())
        };
        let storage = select_storage(name, cookies, &local);
        Self::with_stores(name, defaults, overrides, storage, local)
    }

    /// Creates an entity over explicit stores.
    pub fn with_stores(
        name: &'static str,
        defaults: EntityOptions,
        overrides: &EntityOverrides,
        storage: Arc<dyn ValueStore>,
        local: Arc<dyn ValueStore>,
    ) -> Self {
        let options = overrides.apply(&defaults);
        Self {
            name,
            defaults,
            options,
            storage,
            local,
            id: None,
            traits: Traits::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn options(&self) -> &EntityOptions {
        &self.options
    }

    /// Replaces the options with `overrides` merged over the defaults.
    pub fn set_options(&mut self, overrides: &EntityOverrides) {
        self.options = overrides.apply(&self.defaults);
    }

    pub fn id(&self) -> Option<String> {
        if !self.options.persist {
            return self.id.clone();
        }

        let key = &self.options.cookie.key;
        if let Some(id) = self.storage.get(key).and_then(id_from_value) {
            return Some(id);
        }
        if self.options.local_storage_fallback_disabled {
            return None;
        }

        // Lost cookie: restore it from the local storage backup.
        let id = self.local.get(key).and_then(id_from_value)?;
        self.storage.set(key, &Value::String(id.clone()));
        Some(id)
    }

    pub fn set_id(&mut self, id: Option<&str>) {
        if !self.options.persist {
            self.id = id.map(str::to_string);
            return;
        }

        let key = &self.options.cookie.key;
        let value = id.map_or(Value::Null, |id| Value::String(id.to_string()));
        self.storage.set(key, &value);
        if !self.options.local_storage_fallback_disabled {
            self.local.set(key, &value);
        }
    }

    pub fn traits(&self) -> Traits {
        if !self.options.persist {
            return self.traits.clone();
        }
        match self.local.get(&self.options.local_storage.key) {
            Some(Value::Object(traits)) => traits,
            _ => Traits::new(),
        }
    }

    pub fn set_traits(&mut self, traits: Traits) {
        if self.options.persist {
            self.local.set(&self.options.local_storage.key, &Value::Object(traits));
        } else {
            self.traits = traits;
        }
    }

    pub fn identify(&mut self, id: Option<&str>, traits: Option<Traits>) {
        let mut traits = traits.unwrap_or_default();
        let current = self.id();
        if current.is_none() || current.as_deref() == id {
            let mut merged = self.traits();
            merged.extend(traits);
            traits = merged;
        }

        if let Some(id) = id {
            self.set_id(Some(id));
        }
        log::debug!("{} identify {:?}, {:?}", self.name, id, traits);
        self.set_traits(traits);
        self.save();
    }

    /// Writes the current id and traits to storage. `false` when not
    /// persisting.
    pub fn save(&self) -> bool {
        if !self.options.persist {
            return false;
        }
        let id = self.id().map_or(Value::Null, Value::String);
        self.storage.set(&self.options.cookie.key, &id);
        self.local.set(&self.options.local_storage.key, &Value::Object(self.traits()));
        true
    }

    /// Forgets id and traits in memory and in every store.
    pub fn logout(&mut self) {
        self.set_id(None);
        self.set_traits(Traits::new());
        self.storage.remove(&self.options.cookie.key);
        self.local.remove(&self.options.cookie.key);
        self.local.remove(&self.options.local_storage.key);
    }

    pub fn reset(&mut self) {
        self.logout();
        self.options = self.defaults.clone();
    }

    /// Re-reads id and traits and writes them back through the setters.
    pub fn load(&mut self) {
        let id = self.id();
        self.set_id(id.as_deref());
        let traits = self.traits();
        self.set_traits(traits);
    }
}

impl Entity for PersistentEntity {
    fn id(&self) -> Option<String> {
        PersistentEntity::id(self)
    }

    fn traits(&self) -> Traits {
        PersistentEntity::traits(self)
    }

    fn identify(&mut self, id: Option<&str>, traits: Option<Traits>) {
        PersistentEntity::identify(self, id, traits)
    }

    fn reset(&mut self) {
        PersistentEntity::reset(self)
    }
}

fn select_storage(name: &str, cookies: Arc<CookieStore>, local: &Arc<dyn ValueStore>) -> Arc<dyn ValueStore> {
    let works = cookies.set(COOKIE_PROBE_KEY, &true)
        && cookies.get(COOKIE_PROBE_KEY).is_some_and(|v| is_truthy(&v));
    cookies.remove(COOKIE_PROBE_KEY);

    if works {
        cookies
    } else {
        log::debug!("{name}: cookies unavailable, falling back to local storage");
        local.clone()
    }
}

/// Ids are strings; numeric ids are accepted and stringified.
fn id_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
