//! The negotiating cookie store.
//!
//! [`CookieStore`] sits between the analytics code and a [`CookieJar`]. On
//! (re)configuration it discovers the top domain of its page, merges the
//! caller's overrides over the defaults and then *tests* the resulting scope
//! by writing a probe cookie and reading it back. When the browser silently
//! refuses the cross-subdomain cookie (PaaS subdomains, IP hosts,
//! `localhost`, restrictive policies) the store falls back to host-only
//! cookies. Every later `set`/`get`/`remove` uses the chosen scope.
//!
//! None of the public operations fail loudly: writes report `false`, reads
//! report `None`, and the underlying [`CookieError`] is logged at `debug`.
//!
//! ```rust
//! use analytics_persist::cookies::{CookieStore, DefaultCookieJar};
//! use serde_json::json;
//! use url::Url;
//!
//! let page = Url::parse("https://app.example.com/").unwrap();
//! let store = CookieStore::new(page, DefaultCookieJar::new().into_handle());
//!
//! assert_eq!(store.options().domain.as_deref(), Some(".example.com"));
//! assert!(store.set("ajs_group_id", "g1"));
//! assert_eq!(store.get("ajs_group_id"), Some(json!("g1")));
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::{CookieOptions, CookieOverrides};
use crate::cookies::{top_domain, wire, CookieJar, CookieJarHandle, SameSite};
use crate::errors::CookieError;
use crate::storage::ValueStore;

/// Disposable key used to validate the negotiated scope.
pub const PROBE_KEY: &str = "ajs:test";

/// JSON-safe cookie storage scoped to the widest domain the jar honors.
pub struct CookieStore {
    /// Page the cookies are written from.
    location: Url,
    jar: CookieJarHandle,
    /// Active configuration; replaced wholesale by [`configure`](Self::configure).
    options: RwLock<Arc<CookieOptions>>,
}

impl CookieStore {
    /// Creates a store for `location` and negotiates the default scope.
    pub fn new(location: Url, jar: CookieJarHandle) -> Self {
        Self::with_overrides(location, jar, &CookieOverrides::default())
    }

    /// Creates a store for `location` and negotiates with `overrides`.
    pub fn with_overrides(location: Url, jar: CookieJarHandle, overrides: &CookieOverrides) -> Self {
        let store = Self {
            location,
            jar,
            options: RwLock::new(Arc::new(CookieOptions::default())),
        };
        store.configure(overrides);
        store
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn jar(&self) -> CookieJarHandle {
        self.jar.clone()
    }

    /// Snapshot of the active configuration.
    pub fn options(&self) -> Arc<CookieOptions> {
        self.options.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Negotiates a new active configuration.
    ///
    /// Overrides that fail [`CookieOverrides::validate`] are ignored as a
    /// whole and the derived configuration is used instead.
    ///
    /// The jar's write lock is held for the whole probe sequence, so no
    /// other caller can observe the probe keys.
    pub fn configure(&self, overrides: &CookieOverrides) {
        let fallback;
        let overrides = match overrides.validate() {
            Ok(()) => overrides,
            Err(e) => {
                log::warn!("ignoring invalid cookie overrides: {e}");
                fallback = CookieOverrides::default();
                &fallback
            }
        };

        let options = match self.jar.write() {
            Ok(mut jar) => negotiate(&mut *jar, &self.location, overrides),
            Err(_) => {
                log::debug!("cookie jar unavailable, using host-only scope");
                let mut options = overrides.apply(CookieOptions::default());
                if !overrides.forces_domain() {
                    options.domain = None;
                }
                options
            }
        };

        if options.same_site == SameSite::None && !options.secure {
            log::warn!("SameSite=None without Secure will be refused by most browsers");
        }

        *self.options.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(options);
    }

    /// Stores `value` under `key` as JSON. A value encoding to `null` deletes
    /// the key instead. Returns `false` on any failure.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        report("set", key, self.try_set(key, value))
    }

    /// Reads `key`. Missing, empty or malformed cookies read as `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("cookie get {key:?} failed: {e}");
                None
            }
        }
    }

    /// Reads `key` and decodes it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Deletes `key` under the active scope. Returns `false` on failure.
    pub fn remove(&self, key: &str) -> bool {
        report("remove", key, self.try_remove(key))
    }

    pub fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CookieError> {
        let options = self.options();
        let mut jar = self.jar.write().map_err(|_| CookieError::Poisoned)?;
        write_value(&mut *jar, &self.location, &options, key, value)
    }

    pub fn try_get(&self, key: &str) -> Result<Option<Value>, CookieError> {
        let jar = self.jar.read().map_err(|_| CookieError::Poisoned)?;
        read_value(&*jar, &self.location, key)
    }

    pub fn try_remove(&self, key: &str) -> Result<(), CookieError> {
        let options = self.options();
        let mut jar = self.jar.write().map_err(|_| CookieError::Poisoned)?;
        delete(&mut *jar, &self.location, &options, key)
    }
}

impl ValueStore for CookieStore {
    fn get(&self, key: &str) -> Option<Value> {
        CookieStore::get(self, key)
    }

    fn set(&self, key: &str, value: &Value) -> bool {
        report("set", key, self.try_set(key, value))
    }

    fn remove(&self, key: &str) -> bool {
        CookieStore::remove(self, key)
    }
}

fn report(op: &str, key: &str, result: Result<(), CookieError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::debug!("cookie {op} {key:?} failed: {e}");
            false
        }
    }
}

/// Computes the options for `location`, validating derived domains with
/// the probe key. A caller-forced domain is trusted as-is.
fn negotiate(jar: &mut dyn CookieJar, location: &Url, overrides: &CookieOverrides) -> CookieOptions {
    if overrides.forces_domain() {
        return overrides.apply(CookieOptions::default());
    }

    let derived = top_domain::probe(jar, location).map(|top| format!(".{top}"));
    let mut options = overrides.apply(CookieOptions {
        domain: derived,
        ..CookieOptions::default()
    });

    let accepted = write_value(jar, location, &options, PROBE_KEY, &true).is_ok()
        && matches!(read_value(jar, location, PROBE_KEY), Ok(Some(v)) if is_truthy(&v));

    let _ = delete(jar, location, &options, PROBE_KEY);
    if !accepted && options.domain.is_some() {
        log::debug!(
            "probe cookie refused for domain {:?} on {}, falling back to host-only",
            options.domain,
            location.host_str().unwrap_or_default()
        );
        options.domain = None;
        let _ = delete(jar, location, &options, PROBE_KEY);
    }

    options
}

fn write_value<T: Serialize + ?Sized>(
    jar: &mut dyn CookieJar,
    location: &Url,
    options: &CookieOptions,
    key: &str,
    value: &T,
) -> Result<(), CookieError> {
    let encoded = serde_json::to_string(value)?;
    if encoded == "null" {
        return delete(jar, location, options, key);
    }
    jar.store_cookie(location, &wire::set_cookie_line(key, Some(&encoded), options)?)
}

fn read_value(jar: &dyn CookieJar, location: &Url, key: &str) -> Result<Option<Value>, CookieError> {
    let Some(raw) = jar
        .get_document_cookies(location)
        .and_then(|cookies| wire::find_cookie(&cookies, key))
    else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str(&raw)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

fn delete(jar: &mut dyn CookieJar, location: &Url, options: &CookieOptions, key: &str) -> Result<(), CookieError> {
    jar.store_cookie(location, &wire::set_cookie_line(key, None, options)?)
}

/// JavaScript truthiness of a decoded value.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
