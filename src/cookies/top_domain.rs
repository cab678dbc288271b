//! Registrable ("top") domain discovery without a public-suffix list.
//!
//! Candidate domains are tried from the shortest suffix upward; the first
//! one the jar accepts as a `Domain` attribute is the top domain. The probe
//! cookie is deleted as soon as it is read back.

use url::{Host, Url};

use crate::config::CookieOptions;
use crate::cookies::{wire, CookieJar};

/// Name of the disposable cookie written while probing levels.
pub const TLD_PROBE: &str = "__tld__";

/// Candidate domains for `url`, shortest first. The bare last label is never
/// a candidate.
///
/// `https://a.b.example.com` yields `["example.com", "b.example.com",
/// "a.b.example.com"]`. IP hosts and single-label hosts (`localhost`) yield
/// nothing.
pub fn levels(url: &Url) -> Vec<String> {
    let host = match url.host() {
        Some(Host::Domain(d)) => d.trim_end_matches('.').to_ascii_lowercase(),
        _ => return Vec::new(),
    };
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() <= 1 {
        return Vec::new();
    }

    (0..parts.len() - 1)
        .rev()
        .map(|i| parts[i..].join("."))
        .collect()
}

/// Finds the shortest level of `url` the jar accepts as a cookie domain.
pub(crate) fn probe(jar: &mut dyn CookieJar, url: &Url) -> Option<String> {
    levels(url).into_iter().find(|level| {
        let options = CookieOptions {
            domain: Some(format!(".{level}")),
            ..CookieOptions::default()
        };
        let Ok(line) = wire::set_cookie_line(TLD_PROBE, Some("1"), &options) else {
            return false;
        };
        if jar.store_cookie(url, &line).is_err() {
            return false;
        }

        let accepted = jar
            .get_document_cookies(url)
            .and_then(|cookies| wire::find_cookie(&cookies, TLD_PROBE))
            .is_some();
        if let Ok(delete) = wire::set_cookie_line(TLD_PROBE, None, &options) {
            let _ = jar.store_cookie(url, &delete);
        }
        accepted
    })
}

/// Top domain of `url`, or `None` for `localhost`, IPs and hosts where no
/// level is accepted.
pub fn top_domain(jar: &mut dyn CookieJar, url: &Url) -> Option<String> {
    probe(jar, url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::{DefaultCookieJar, JarPolicy};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn levels_from_shortest_suffix() {
        assert_eq!(
            levels(&url("https://a.b.example.com/x")),
            vec!["example.com", "b.example.com", "a.b.example.com"]
        );
        assert_eq!(levels(&url("https://example.com")), vec!["example.com"]);
        assert_eq!(levels(&url("https://Shop.Example.COM./")), vec!["example.com", "shop.example.com"]);
    }

    #[test]
    fn no_levels_for_localhost_and_ips() {
        assert!(levels(&url("http://localhost:8080/")).is_empty());
        assert!(levels(&url("http://127.0.0.1/")).is_empty());
        assert!(levels(&url("http://[::1]:3000/")).is_empty());
        assert!(levels(&url("file:///tmp/index.html")).is_empty());
    }

    #[test]
    fn finds_registrable_domain() {
        let mut jar = DefaultCookieJar::new();
        assert_eq!(top_domain(&mut jar, &url("https://app.example.com/")).as_deref(), Some("example.com"));
        assert!(jar.entries.is_empty());
    }

    #[test]
    fn skips_public_suffixes() {
        let mut jar = DefaultCookieJar::with_policy(JarPolicy::default().with_public_suffix("co.uk"));
        assert_eq!(top_domain(&mut jar, &url("https://www.shop.co.uk/")).as_deref(), Some("shop.co.uk"));
        assert!(jar.entries.is_empty());
    }

    #[test]
    fn none_when_every_level_is_refused() {
        let mut jar = DefaultCookieJar::with_policy(JarPolicy {
            reject_domain_cookies: true,
            ..JarPolicy::default()
        });
        assert_eq!(top_domain(&mut jar, &url("https://myapp.herokuapp.com/")), None);
        assert!(jar.entries.is_empty());
    }
}
