//! Persistence layer for client-side analytics identities.
//!
//! Small identity facts (a visitor id, a group id, traits) are kept in
//! cookies scoped as widely as the browser allows, with local storage and
//! memory as fallbacks. The cookie scope is negotiated empirically by
//! [`CookieStore`]: no public-suffix list is consulted.

pub mod config;
pub mod cookies;
pub mod entity;
pub mod errors;
pub mod storage;

pub use config::{CookieDomain, CookieOptions, CookieOverrides};
pub use cookies::{CookieJar, CookieJarHandle, CookieStore, DefaultCookieJar, JarPolicy, SameSite};
pub use entity::{Entity, EntityOptions, EntityOverrides, GroupEntity, PersistentEntity, Traits};
pub use storage::{LocalStorage, LocalStore, StorageArea, ValueStore};
