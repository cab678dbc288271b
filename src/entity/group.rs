use std::sync::Arc;

use crate::cookies::CookieStore;
use crate::entity::{Entity, EntityOptions, EntityOverrides, PersistentEntity, StoreKey, Traits};
use crate::storage::LocalStorage;

/// Cookie holding the group id.
pub const GROUP_COOKIE_KEY: &str = "ajs_group_id";
/// Local storage slot holding the group traits.
pub const GROUP_TRAITS_KEY: &str = "ajs_group_properties";

/// The "group" identity: a [`PersistentEntity`] with fixed keys, persisted
/// by default.
///
/// ```rust
/// use std::sync::Arc;
/// use analytics_persist::cookies::{CookieStore, DefaultCookieJar};
/// use analytics_persist::entity::{Entity, GroupEntity};
/// use analytics_persist::storage::{InMemoryLocalStore, LocalStorage, LocalStore};
/// use url::Url;
///
/// let page = Url::parse("https://app.example.com/").unwrap();
/// let area = InMemoryLocalStore::new().area(&page.origin()).unwrap();
/// let cookies = Arc::new(CookieStore::new(page, DefaultCookieJar::new().into_handle()));
///
/// let mut group = GroupEntity::new(cookies.clone(), LocalStorage::new(area), None);
/// group.identify(Some("g1"), None);
/// assert_eq!(cookies.get("ajs_group_id"), Some(serde_json::json!("g1")));
/// ```
pub struct GroupEntity {
    entity: PersistentEntity,
}

impl GroupEntity {
    /// Default group configuration.
    pub fn defaults() -> EntityOptions {
        EntityOptions {
            persist: true,
            cookie: StoreKey::new(GROUP_COOKIE_KEY),
            local_storage: StoreKey::new(GROUP_TRAITS_KEY),
            local_storage_fallback_disabled: false,
        }
    }

    pub fn new(cookies: Arc<CookieStore>, local: LocalStorage, overrides: Option<&EntityOverrides>) -> Self {
        let overrides = overrides.cloned().unwrap_or_default();
        Self {
            entity: PersistentEntity::new("group", Self::defaults(), &overrides, cookies, local),
        }
    }

    /// Wraps an already-built entity, e.g. one over explicit stores.
    pub fn from_entity(entity: PersistentEntity) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &PersistentEntity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut PersistentEntity {
        &mut self.entity
    }

    pub fn options(&self) -> &EntityOptions {
        self.entity.options()
    }

    pub fn save(&self) -> bool {
        self.entity.save()
    }

    pub fn logout(&mut self) {
        self.entity.logout()
    }

    pub fn load(&mut self) {
        self.entity.load()
    }
}

impl Entity for GroupEntity {
    fn id(&self) -> Option<String> {
        self.entity.id()
    }

    fn traits(&self) -> Traits {
        self.entity.traits()
    }

    fn identify(&mut self, id: Option<&str>, traits: Option<Traits>) {
        self.entity.identify(id, traits)
    }

    fn reset(&mut self) {
        self.entity.reset()
    }
}
