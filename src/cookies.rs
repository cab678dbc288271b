// src/cookies.rs
//! Cookies: the [`CookieJar`] backends and the negotiating [`CookieStore`].

mod cookies;
mod cookie_jar;
mod cookie_store;
mod persistent_cookie_jar;
pub mod top_domain;
mod wire;

pub use cookies::Cookie;
pub use cookies::CookieJarHandle;
pub use cookies::SameSite;

pub use cookie_jar::CookieJar;
pub use cookie_jar::DefaultCookieJar;
pub use cookie_jar::JarPolicy;
pub use persistent_cookie_jar::PersistentCookieJar;

pub use cookie_store::CookieStore;
pub use cookie_store::PROBE_KEY;
pub(crate) use cookie_store::is_truthy;
