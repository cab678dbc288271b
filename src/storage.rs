//! Secondary storage for persistent entities.
//!
//! This module defines the traits, types and implementations behind the
//! **local storage** an entity uses next to its cookie, plus the JSON-level
//! [`ValueStore`] abstraction that lets an entity treat cookies, local
//! storage and plain memory interchangeably.
//!
//! # Concepts
//!
//! - [`StorageArea`]: DOM-style string key/value area (`localStorage`).
//! - [`LocalStore`]: hands out the area for an origin.
//! - [`ValueStore`]: JSON-safe `get`/`set`/`remove` with boolean / optional
//!   results; implemented by [`CookieStore`](crate::cookies::CookieStore),
//!   [`LocalStorage`] and [`MemoryStore`].
//!
//! # Choosing a backend
//!
//! - For persistent local storage, use [`SqliteLocalStore`] (default
//!   `sqlite_local_store` feature).
//! - For tests or private browsing, use [`InMemoryLocalStore`], optionally
//!   with a byte quota or disabled.
//!
//! # Example
//!
//! ```rust
//! use analytics_persist::storage::{InMemoryLocalStore, LocalStorage, LocalStore, ValueStore};
//! use serde_json::json;
//!
//! let origin = url::Url::parse("https://app.example.com").unwrap().origin();
//! let area = InMemoryLocalStore::new().area(&origin).unwrap();
//! let local = LocalStorage::new(area);
//!
//! assert!(local.is_enabled());
//! assert!(local.set("ajs_group_properties", &json!({"plan": "pro"})));
//! ```

/// Storage area module, defining the key/value storage interface.
pub mod area;
/// JSON value stores layered over cookies, local storage and memory.
pub mod value_store;

/// Local storage module, providing storage area backends.
pub mod local {
    /// In-memory local storage implementation.
    pub mod in_memory;
    /// SQLite-backed local storage implementation.
    #[cfg(feature = "sqlite_local_store")]
    pub mod sqlite_store;
}

pub use area::{LocalStore, StorageArea};
pub use local::in_memory::InMemoryLocalStore;
#[cfg(feature = "sqlite_local_store")]
pub use local::sqlite_store::SqliteLocalStore;
pub use value_store::{LocalStorage, MemoryStore, ValueStore};
