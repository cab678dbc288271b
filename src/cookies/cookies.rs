//! Cookie core types.
//!
//! This module defines the **type-erased jar handle** shared between the
//! [`CookieStore`](crate::cookies::CookieStore) and whoever owns the browser
//! state, and the serializable [`Cookie`] record jars keep.
//!
//! # Concurrency model
//! - [`CookieJarHandle`] is `Arc<RwLock<dyn CookieJar + Send + Sync>>`.
//!   - Callers take a **read lock** for `document.cookie`-style reads and a
//!     **write lock** for writes.
//!   - The cookie store holds the write lock for its whole probe sequence,
//!     so probe keys are never visible to other callers.
//!
//! ```rust
//! use analytics_persist::cookies::{Cookie, SameSite};
//!
//! let c = Cookie {
//!     name: "ajs_group_id".into(),
//!     value: "%22g1%22".into(),
//!     host: "app.example.com".into(),
//!     domain: Some("example.com".into()),
//!     path: "/".into(),
//!     secure: false,
//!     expires: None,
//!     same_site: Some(SameSite::Lax),
//!     http_only: false,
//! };
//! assert!(c.matches_host("www.example.com"));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::cookies::CookieJar;

/// A handle to a cookie jar trait.
///
/// This is a reference-counted, read/write-locked pointer to a type-erased
/// [`CookieJar`]. Obtain a **read lock** for queries and a **write lock** for
/// mutations.
pub type CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>;

/// `SameSite` cross-site sending policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("strict") {
            Ok(SameSite::Strict)
        } else if s.eq_ignore_ascii_case("lax") {
            Ok(SameSite::Lax)
        } else if s.eq_ignore_ascii_case("none") {
            Ok(SameSite::None)
        } else {
            Err(format!("unknown SameSite value {s:?}"))
        }
    }
}

/// A cookie as stored by a jar.
///
/// This structure captures the attributes a jar needs for matching and is
/// suitable for persistence via `serde`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name, as written on the wire (URI-component encoded).
    pub name: String,

    /// Raw cookie value, as written on the wire.
    pub value: String,

    /// Host of the page that set the cookie.
    pub host: String,

    /// Domain scoping without leading dot. `None` means host-only.
    pub domain: Option<String>,

    /// Path scoping (e.g., `"/"`).
    pub path: String,

    /// If `true`, cookie is only visible to HTTPS pages.
    pub secure: bool,

    /// Expiration timestamp. Session cookies have `None`.
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,

    pub same_site: Option<SameSite>,

    /// If `true`, cookie is hidden from `document.cookie`.
    pub http_only: bool,
}

impl Cookie {
    /// Returns `true` when `host` may see this cookie.
    pub fn matches_host(&self, host: &str) -> bool {
        match &self.domain {
            Some(domain) => domain_matches(host, domain),
            None => host.eq_ignore_ascii_case(&self.host),
        }
    }

    /// RFC 6265 path-match.
    pub fn matches_path(&self, request_path: &str) -> bool {
        if request_path == self.path {
            return true;
        }
        request_path.starts_with(&self.path)
            && (self.path.ends_with('/') || request_path[self.path.len()..].starts_with('/'))
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    /// Returns `true` when both records address the same storage slot.
    pub(crate) fn same_slot(&self, other: &Cookie) -> bool {
        self.name == other.name
            && self.path == other.path
            && match (&self.domain, &other.domain) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => self.host.eq_ignore_ascii_case(&other.host),
                _ => false,
            }
    }
}

/// `host` equals `domain` or is a subdomain of it.
pub(crate) fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(domain: Option<&str>, path: &str) -> Cookie {
        Cookie {
            name: "k".into(),
            value: "v".into(),
            host: "app.example.com".into(),
            domain: domain.map(str::to_string),
            path: path.into(),
            secure: false,
            expires: None,
            same_site: None,
            http_only: false,
        }
    }

    #[test]
    fn host_only_cookie_is_not_shared_with_subdomains() {
        let c = cookie(None, "/");
        assert!(c.matches_host("app.example.com"));
        assert!(!c.matches_host("www.app.example.com"));
        assert!(!c.matches_host("example.com"));
    }

    #[test]
    fn domain_cookie_is_shared_with_subdomains() {
        let c = cookie(Some("example.com"), "/");
        assert!(c.matches_host("example.com"));
        assert!(c.matches_host("deep.www.example.com"));
        assert!(!c.matches_host("badexample.com"));
    }

    #[test]
    fn path_match_follows_segment_boundaries() {
        let c = cookie(None, "/shop");
        assert!(c.matches_path("/shop"));
        assert!(c.matches_path("/shop/cart"));
        assert!(!c.matches_path("/shopping"));
        assert!(!c.matches_path("/"));
        assert!(cookie(None, "/").matches_path("/anything"));
    }

    #[test]
    fn samesite_parses_case_insensitively() {
        assert_eq!("lax".parse::<SameSite>(), Ok(SameSite::Lax));
        assert_eq!(" STRICT ".parse::<SameSite>(), Ok(SameSite::Strict));
        assert_eq!("None".parse::<SameSite>(), Ok(SameSite::None));
        assert!("sometimes".parse::<SameSite>().is_err());
        assert_eq!(SameSite::None.to_string(), "None");
    }

    #[test]
    fn cookie_survives_json_persistence() {
        let mut c = cookie(Some("example.com"), "/");
        c.expires = Some(OffsetDateTime::UNIX_EPOCH + time::Duration::days(20_000));
        let json = serde_json::to_string(&c).unwrap();
        let back: Cookie = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
