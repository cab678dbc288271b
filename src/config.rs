//! Cookie configuration.
//!
//! [`CookieOptions`] is the negotiated, immutable configuration a
//! [`CookieStore`](crate::cookies::CookieStore) writes with. Callers never
//! build it directly; they pass a partial [`CookieOverrides`] which is merged
//! over the defaults during negotiation (caller fields win).
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use analytics_persist::config::CookieOptions;
//! let opts = CookieOptions::default();
//! assert_eq!(opts.path, "/");
//! assert_eq!(opts.domain, None);
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use analytics_persist::config::CookieOverrides;
//! use analytics_persist::cookies::SameSite;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let overrides = CookieOverrides::builder()
//!     .max_age_millis(86_400_000)
//!     .secure(true)
//!     .same_site(SameSite::Strict)
//!     .build()?; // returns Result<CookieOverrides, ConfigError>
//! # Ok(()) }
//! ```
//!
//! Overrides can also be loaded from JSON settings:
//! ```rust
//! use analytics_persist::config::{CookieDomain, CookieOverrides};
//! let o: CookieOverrides = serde_json::from_str(r#"{"domain": "host_only", "path": "/app"}"#).unwrap();
//! assert_eq!(o.domain, Some(CookieDomain::HostOnly));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cookies::SameSite;
use crate::errors::ConfigError;

/// Default cookie lifetime: one year.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(31_536_000_000);

/// Active cookie configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// Cookie lifetime.
    pub max_age: Duration,
    /// `Domain` attribute including the leading dot. `None` means host-only.
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            domain: None,
            path: "/".to_string(),
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

/// A caller-forced cookie scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieDomain {
    /// No `Domain` attribute.
    HostOnly,
    /// Explicit domain, e.g. `".example.com"`.
    Domain(String),
}

/// Partial cookie configuration supplied by the caller.
///
/// Every `None` field takes the negotiated default. A `Some(domain)` is
/// trusted as-is and is not validated by the probe cookie. Overrides that
/// fail [`validate`](Self::validate) are ignored by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOverrides {
    pub max_age_millis: Option<u64>,
    pub domain: Option<CookieDomain>,
    pub path: Option<String>,
    pub secure: Option<bool>,
    pub same_site: Option<SameSite>,
}

impl CookieOverrides {
    pub fn builder() -> CookieOverridesBuilder {
        CookieOverridesBuilder::default()
    }

    /// Returns `true` when the caller forced a domain (or host-only) scope.
    pub fn forces_domain(&self) -> bool {
        self.domain.is_some()
    }

    /// Merges these overrides over `base`. `self` is left untouched.
    pub fn apply(&self, base: CookieOptions) -> CookieOptions {
        CookieOptions {
            max_age: self.max_age_millis.map(Duration::from_millis).unwrap_or(base.max_age),
            domain: match &self.domain {
                Some(CookieDomain::HostOnly) => None,
                Some(CookieDomain::Domain(d)) => Some(d.clone()),
                None => base.domain,
            },
            path: self.path.clone().unwrap_or(base.path),
            secure: self.secure.unwrap_or(base.secure),
            same_site: self.same_site.unwrap_or(base.same_site),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidPath(path.clone()));
            }
        }
        if self.max_age_millis == Some(0) {
            return Err(ConfigError::ZeroMaxAge);
        }
        if let Some(CookieDomain::Domain(d)) = &self.domain {
            if d.trim_start_matches('.').is_empty() || d.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidDomain(d.clone()));
            }
        }
        Ok(())
    }
}

/// Builder for [`CookieOverrides`].
#[derive(Debug, Clone, Default)]
pub struct CookieOverridesBuilder {
    inner: CookieOverrides,
}

impl CookieOverridesBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut CookieOverrides)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn max_age_millis(self, ms: u64) -> Self { self.map(|c| c.max_age_millis = Some(ms)) }
    pub fn max_age(self, d: Duration) -> Self { self.map(|c| c.max_age_millis = Some(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))) }
    pub fn domain<S: Into<String>>(self, d: S) -> Self { self.map(|c| c.domain = Some(CookieDomain::Domain(d.into()))) }
    pub fn host_only(self) -> Self { self.map(|c| c.domain = Some(CookieDomain::HostOnly)) }
    pub fn path<S: Into<String>>(self, p: S) -> Self { self.map(|c| c.path = Some(p.into())) }
    pub fn secure(self, on: bool) -> Self { self.map(|c| c.secure = Some(on)) }
    pub fn same_site(self, s: SameSite) -> Self { self.map(|c| c.same_site = Some(s)) }

    /// Validate and build the overrides.
    pub fn build(self) -> Result<CookieOverrides, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
