//! Persistent identities: an id plus a trait mapping.
//!
//! [`PersistentEntity`] does the bookkeeping; named entities such as
//! [`GroupEntity`] own one configured with their own storage keys.

mod group;
mod options;
mod persistent_entity;

pub use group::{GroupEntity, GROUP_COOKIE_KEY, GROUP_TRAITS_KEY};
pub use options::{EntityOptions, EntityOverrides, StoreKey};
pub use persistent_entity::{PersistentEntity, COOKIE_PROBE_KEY};

/// Trait mapping of an entity.
pub type Traits = serde_json::Map<String, serde_json::Value>;

/// Capability shared by every persisted identity.
pub trait Entity {
    /// Current id, if any.
    fn id(&self) -> Option<String>;

    /// Copy of the current traits; empty when none are stored.
    fn traits(&self) -> Traits;

    /// Sets the id (when given) and traits, merging with the stored traits
    /// when the id is unchanged or previously unknown, then saves.
    fn identify(&mut self, id: Option<&str>, traits: Option<Traits>);

    /// Forgets id and traits everywhere and restores default options.
    fn reset(&mut self);
}
