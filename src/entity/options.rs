use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Name of one storage slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreKey {
    pub key: String,
}

impl StoreKey {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self { key: key.into() }
    }
}

/// Storage configuration of a [`PersistentEntity`](crate::entity::PersistentEntity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOptions {
    /// Keep id and traits in storage rather than in memory only.
    pub persist: bool,
    /// Slot for the id (in the primary store, and backed up in local storage).
    pub cookie: StoreKey,
    /// Local storage slot for the traits.
    pub local_storage: StoreKey,
    /// Do not mirror the id into local storage.
    #[serde(default)]
    pub local_storage_fallback_disabled: bool,
}

/// Partial entity configuration; `Some` fields win over the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityOverrides {
    pub persist: Option<bool>,
    pub cookie: Option<StoreKey>,
    pub local_storage: Option<StoreKey>,
    pub local_storage_fallback_disabled: Option<bool>,
}

impl EntityOverrides {
    pub fn builder() -> EntityOverridesBuilder {
        EntityOverridesBuilder::default()
    }

    /// Merges these overrides over `defaults`.
    pub fn apply(&self, defaults: &EntityOptions) -> EntityOptions {
        EntityOptions {
            persist: self.persist.unwrap_or(defaults.persist),
            cookie: self.cookie.clone().unwrap_or_else(|| defaults.cookie.clone()),
            local_storage: self
                .local_storage
                .clone()
                .unwrap_or_else(|| defaults.local_storage.clone()),
            local_storage_fallback_disabled: self
                .local_storage_fallback_disabled
                .unwrap_or(defaults.local_storage_fallback_disabled),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cookie.as_ref().is_some_and(|k| k.key.is_empty()) {
            return Err(ConfigError::EmptyKey("cookie"));
        }
        if self.local_storage.as_ref().is_some_and(|k| k.key.is_empty()) {
            return Err(ConfigError::EmptyKey("local storage"));
        }
        Ok(())
    }
}

/// Builder for [`EntityOverrides`].
#[derive(Debug, Clone, Default)]
pub struct EntityOverridesBuilder {
    inner: EntityOverrides,
}

impl EntityOverridesBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut EntityOverrides)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn persist(self, on: bool) -> Self { self.map(|c| c.persist = Some(on)) }
    pub fn cookie_key<S: Into<String>>(self, key: S) -> Self { self.map(|c| c.cookie = Some(StoreKey::new(key))) }
    pub fn local_storage_key<S: Into<String>>(self, key: S) -> Self { self.map(|c| c.local_storage = Some(StoreKey::new(key))) }
    pub fn local_storage_fallback_disabled(self, on: bool) -> Self { self.map(|c| c.local_storage_fallback_disabled = Some(on)) }

    /// Validate and build the overrides.
    pub fn build(self) -> Result<EntityOverrides, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
