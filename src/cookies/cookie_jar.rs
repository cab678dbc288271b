//! Cookie jar abstraction and a browser-like in-memory implementation.
//!
//! A **cookie jar** is the raw cookie API of a page: scripts write one
//! `Set-Cookie`-style line at a time and read back the `"a=1; b=2"` string
//! visible to a URL. It is the surface the
//! [`CookieStore`](crate::cookies::CookieStore) negotiates against.
//!
//! [`DefaultCookieJar`] stores cookies **in memory only** and enforces the
//! rules that make domain negotiation necessary in the first place:
//! - a `Domain` attribute must domain-match the page host,
//! - IP hosts never accept a foreign `Domain`,
//! - single-label domains and anything in [`JarPolicy::public_suffixes`] are
//!   refused as a `Domain` (unless equal to the host, where the cookie
//!   becomes host-only),
//! - `Secure` cookies require an `https` page, `SameSite=None` requires
//!   `Secure`, and `HttpOnly` cannot be set from script.
//!
//! ## Notes & limitations
//! - There is no bundled public-suffix list; callers describe the suffixes
//!   their environment refuses through [`JarPolicy`].
//! - `Expires` is parsed as RFC 2822; `Max-Age` wins when both are present.
//! - This module is **not** internally synchronized. Use it via a
//!   `CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>`.
use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;
use url::{Host, Url};

use crate::cookies::cookies::domain_matches;
use crate::cookies::{Cookie, CookieJarHandle, SameSite};
use crate::errors::CookieError;

/// The raw cookie API of one page context.
///
/// ### Type erasure
/// `as_any` / `as_any_mut` enable downcasting when callers need access to
/// concrete implementations (e.g., for snapshotting/persistence).
pub trait CookieJar: Send + Sync {
    /// Returns a type-erased reference to the jar.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable type-erased reference to the jar.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Applies one `Set-Cookie` line written by a script on `url`.
    ///
    /// A line whose expiry is in the past deletes the matching cookie.
    /// Returns an error when the jar refuses the cookie.
    fn store_cookie(&mut self, url: &Url, set_cookie: &str) -> Result<(), CookieError>;

    /// Returns the cookie string a script on `url` sees, if any.
    ///
    /// Implementations should filter by domain, path, the `Secure` flag and
    /// hide `HttpOnly` cookies. `None` means no cookie is visible.
    fn get_document_cookies(&self, url: &Url) -> Option<String>;

    /// Removes all cookies from the jar.
    fn clear(&mut self);

    /// Returns every unexpired cookie, for inspection.
    fn get_all_cookies(&self) -> Vec<Cookie>;

    /// Removes every cookie named `cookie_name` that is visible to `url`.
    fn remove_cookie(&mut self, url: &Url, cookie_name: &str);
}

/// What a [`DefaultCookieJar`] refuses, mirroring browser restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JarPolicy {
    /// Domains refused in a `Domain` attribute (e.g. `"herokuapp.com"`).
    pub public_suffixes: HashSet<String>,
    /// Refuse every cookie carrying a `Domain` attribute.
    pub reject_domain_cookies: bool,
    /// Refuse every write (cookies disabled).
    pub disabled: bool,
    /// Maximum number of cookies held at once.
    pub max_cookies: Option<usize>,
}

impl JarPolicy {
    pub fn with_public_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.public_suffixes.insert(suffix.into().trim_start_matches('.').to_ascii_lowercase());
        self
    }

    fn is_public_suffix(&self, domain: &str) -> bool {
        !domain.contains('.') || self.public_suffixes.contains(domain)
    }
}

/// Default cookie jar for a single browsing context.
///
/// This implementation is **in-memory only**; wrap it in a
/// [`PersistentCookieJar`](crate::cookies::PersistentCookieJar) to keep
/// cookies across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultCookieJar {
    /// Cookie records in insertion order.
    pub entries: Vec<Cookie>,

    #[serde(skip)]
    pub policy: JarPolicy,
}

impl DefaultCookieJar {
    /// Creates an empty jar that accepts everything a browser would.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: JarPolicy) -> Self {
        DefaultCookieJar {
            entries: Vec::new(),
            policy,
        }
    }

    pub fn into_handle(self) -> CookieJarHandle {
        Arc::new(RwLock::new(self))
    }

    fn parse(&self, url: &Url, line: &str, now: OffsetDateTime) -> Result<ParsedCookie, CookieError> {
        let host = url
            .host_str()
            .ok_or_else(|| CookieError::Rejected(format!("{url} has no host")))?
            .to_ascii_lowercase();

        let mut parts = line.split(';');
        let (name, value) = parts
            .next()
            .and_then(|pair| pair.split_once('='))
            .ok_or_else(|| CookieError::Malformed(line.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CookieError::Malformed(line.to_string()));
        }

        let mut cookie = Cookie {
            name: name.to_string(),
            value: value.trim().to_string(),
            host: host.clone(),
            domain: None,
            path: default_path(url),
            secure: false,
            expires: None,
            same_site: None,
            http_only: false,
        };
        let mut max_age: Option<i64> = None;

        for part in parts {
            let part = part.trim();
            if let Some((k, v)) = part.split_once('=') {
                let v = v.trim();
                match k.trim().to_ascii_lowercase().as_str() {
                    "path" if v.starts_with('/') => cookie.path = v.to_string(),
                    "domain" => {
                        let d = v.trim_start_matches('.').to_ascii_lowercase();
                        // An empty Domain attribute is ignored.
                        if !d.is_empty() {
                            cookie.domain = Some(d);
                        }
                    }
                    "max-age" => max_age = v.parse().ok(),
                    "expires" => {
                        if let Ok(at) = OffsetDateTime::parse(v, &Rfc2822) {
                            cookie.expires = Some(at);
                        }
                    }
                    "samesite" => cookie.same_site = v.parse::<SameSite>().ok(),
                    _ => {}
                }
            } else if part.eq_ignore_ascii_case("secure") {
                cookie.secure = true;
            } else if part.eq_ignore_ascii_case("httponly") {
                cookie.http_only = true;
            }
        }

        if let Some(secs) = max_age {
            cookie.expires = Some(if secs <= 0 {
                OffsetDateTime::UNIX_EPOCH
            } else {
                now.checked_add(time::Duration::seconds(secs)).unwrap_or(now)
            });
        }

        if let Some(domain) = cookie.domain.take() {
            cookie.domain = self.check_domain(url, &host, domain)?;
        }
        if cookie.secure && url.scheme() != "https" {
            return Err(CookieError::Rejected("Secure cookie from an insecure page".into()));
        }
        if cookie.same_site == Some(SameSite::None) && !cookie.secure {
            return Err(CookieError::Rejected("SameSite=None requires Secure".into()));
        }
        if cookie.http_only {
            return Err(CookieError::Rejected("HttpOnly cannot be set from script".into()));
        }

        let expired = cookie.is_expired(now);
        Ok(ParsedCookie { cookie, expired })
    }

    /// Validates a `Domain` attribute. `Ok(None)` downgrades to host-only.
    fn check_domain(&self, url: &Url, host: &str, domain: String) -> Result<Option<String>, CookieError> {
        if self.policy.reject_domain_cookies {
            return Err(CookieError::Rejected(format!("domain cookies refused ({domain})")));
        }
        if matches!(url.host(), Some(Host::Ipv4(_)) | Some(Host::Ipv6(_))) {
            return if domain == host {
                Ok(None)
            } else {
                Err(CookieError::Rejected(format!("{domain} on IP host {host}")))
            };
        }
        if !domain_matches(host, &domain) {
            return Err(CookieError::Rejected(format!("{domain} does not match {host}")));
        }
        if self.policy.is_public_suffix(&domain) {
            return if domain == host {
                Ok(None)
            } else {
                Err(CookieError::Rejected(format!("{domain} is a public suffix")))
            };
        }
        Ok(Some(domain))
    }

    fn purge_expired(&mut self, now: OffsetDateTime) {
        self.entries.retain(|c| !c.is_expired(now));
    }
}

struct ParsedCookie {
    cookie: Cookie,
    expired: bool,
}

/// RFC 6265 default-path of a request URL.
fn default_path(url: &Url) -> String {
    url.path()
        .rsplit_once('/')
        .map_or("/", |(a, _)| if a.is_empty() { "/" } else { a })
        .to_string()
}

impl CookieJar for DefaultCookieJar {
    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }

    fn store_cookie(&mut self, url: &Url, set_cookie: &str) -> Result<(), CookieError> {
        if self.policy.disabled {
            return Err(CookieError::Disabled);
        }

        let now = OffsetDateTime::now_utc();
        let ParsedCookie { cookie, expired } = self.parse(url, set_cookie, now)?;

        self.purge_expired(now);
        let existing = self.entries.iter().position(|c| c.same_slot(&cookie));

        if expired {
            if let Some(idx) = existing {
                self.entries.remove(idx);
            }
            return Ok(());
        }

        match existing {
            // Replace existing cookie in the same slot
            Some(idx) => self.entries[idx] = cookie,
            None => {
                if let Some(max) = self.policy.max_cookies {
                    if self.entries.len() >= max {
                        return Err(CookieError::Rejected(format!("cookie limit of {max} reached")));
                    }
                }
                self.entries.push(cookie);
            }
        }
        Ok(())
    }

    fn get_document_cookies(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?;
        let path = url.path();
        let is_https = url.scheme() == "https";
        let now = OffsetDateTime::now_utc();

        let mut visible: Vec<&Cookie> = self
            .entries
            .iter()
            .filter(|c| !c.is_expired(now))
            .filter(|c| c.matches_host(host))
            .filter(|c| c.matches_path(path))
            .filter(|c| !c.secure || is_https)
            .filter(|c| !c.http_only)
            .collect();

        // Longer paths first, otherwise insertion order.
        visible.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

        let header = visible
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn get_all_cookies(&self) -> Vec<Cookie> {
        let now = OffsetDateTime::now_utc();
        self.entries.iter().filter(|c| !c.is_expired(now)).cloned().collect()
    }

    fn remove_cookie(&mut self, url: &Url, cookie_name: &str) {
        let host = url.host_str().unwrap_or_default();
        let path = url.path();
        self.entries
            .retain(|c| !(c.name == cookie_name && c.matches_host(host) && c.matches_path(path)));
    }
}
