use std::any::Any;
use std::sync::{Arc, RwLock};

use analytics_persist::cookies::{Cookie, CookieJar, CookieStore, DefaultCookieJar, JarPolicy, PROBE_KEY};
use analytics_persist::cookies::top_domain::TLD_PROBE;
use analytics_persist::errors::CookieError;
use analytics_persist::CookieJarHandle;
use serde_json::json;
use url::Url;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn store_on(page: &str, jar: CookieJarHandle) -> CookieStore {
    init();
    CookieStore::new(Url::parse(page).unwrap(), jar)
}

fn cookie_names(jar: &CookieJarHandle) -> Vec<String> {
    let guard = jar.read().unwrap();
    let names = guard.get_all_cookies().into_iter().map(|c| c.name).collect();
    names
}

/// Accepts the top-domain probe but silently drops the validation probe
/// when it carries a `Domain`, like a browser with a partial suffix list.
struct SelectiveJar {
    inner: DefaultCookieJar,
}

impl CookieJar for SelectiveJar {
    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }

    fn store_cookie(&mut self, url: &Url, set_cookie: &str) -> Result<(), CookieError> {
        if set_cookie.starts_with("ajs%3Atest=true") && set_cookie.contains("Domain=") {
            // accepted, never stored
            return Ok(());
        }
        self.inner.store_cookie(url, set_cookie)
    }

    fn get_document_cookies(&self, url: &Url) -> Option<String> {
        self.inner.get_document_cookies(url)
    }

    fn clear(&mut self) {
        self.inner.clear()
    }

    fn get_all_cookies(&self) -> Vec<Cookie> {
        self.inner.get_all_cookies()
    }

    fn remove_cookie(&mut self, url: &Url, cookie_name: &str) {
        self.inner.remove_cookie(url, cookie_name)
    }
}

#[test]
fn app_subdomain_negotiates_registrable_domain() {
    let jar = DefaultCookieJar::new().into_handle();
    let store = store_on("https://app.example.com/", jar.clone());

    assert_eq!(store.options().domain.as_deref(), Some(".example.com"));
    assert!(store.set("ajs_group_id", "g1"));
    assert_eq!(store.get("ajs_group_id"), Some(json!("g1")));

    // the cookie is shared with sibling subdomains
    let sibling = store_on("https://www.example.com/", jar.clone());
    assert_eq!(sibling.get("ajs_group_id"), Some(json!("g1")));
    assert_eq!(cookie_names(&jar), vec!["ajs_group_id"]);
}

#[test]
fn paas_subdomain_with_domain_rejection_uses_host_only() {
    let jar = DefaultCookieJar::with_policy(JarPolicy {
        reject_domain_cookies: true,
        ..JarPolicy::default()
    })
    .into_handle();
    let store = store_on("https://myapp.herokuapp.com/", jar.clone());

    assert_eq!(store.options().domain, None);
    assert!(cookie_names(&jar).is_empty());

    assert!(store.set("ajs_group_id", "g1"));
    assert_eq!(store.get("ajs_group_id"), Some(json!("g1")));
}

#[test]
fn paas_suffix_is_skipped_by_level_probing() {
    let jar = DefaultCookieJar::with_policy(JarPolicy::default().with_public_suffix("herokuapp.com")).into_handle();
    let store = store_on("https://myapp.herokuapp.com/", jar.clone());

    assert_eq!(store.options().domain.as_deref(), Some(".myapp.herokuapp.com"));
    assert!(cookie_names(&jar).is_empty());
}

#[test]
fn localhost_and_bare_ips_are_host_only() {
    for page in ["http://localhost:3000/", "http://127.0.0.1:8080/", "http://[::1]/"] {
        let jar = DefaultCookieJar::new().into_handle();
        let store = store_on(page, jar.clone());

        assert_eq!(store.options().domain, None, "{page}");
        assert!(store.set("k", &json!({"v": 1})), "{page}");
        assert_eq!(store.get("k"), Some(json!({"v": 1})), "{page}");
    }
}

#[test]
fn refused_validation_probe_falls_back_and_cleans_up() {
    let jar: CookieJarHandle = Arc::new(RwLock::new(SelectiveJar { inner: DefaultCookieJar::new() }));
    let store = store_on("https://app.example.com/", jar.clone());

    assert_eq!(store.options().domain, None);
    let names = cookie_names(&jar);
    assert!(!names.iter().any(|n| n == "ajs%3Atest" || n == TLD_PROBE), "{names:?}");

    assert!(store.set("ajs_group_id", "g1"));
    assert_eq!(store.get("ajs_group_id"), Some(json!("g1")));
    assert_eq!(store.get(PROBE_KEY), None);
}

#[test]
fn null_is_stored_as_absence() {
    let jar = DefaultCookieJar::new().into_handle();
    let store = store_on("https://app.example.com/", jar.clone());

    assert!(store.set("ajs_group_id", "g1"));
    assert!(store.set("ajs_group_id", &serde_json::Value::Null));
    assert_eq!(store.get("ajs_group_id"), None);
    assert!(cookie_names(&jar).is_empty());
}

#[test]
fn failures_never_escape() {
    let jar = DefaultCookieJar::with_policy(JarPolicy { disabled: true, ..JarPolicy::default() }).into_handle();
    let store = store_on("https://app.example.com/", jar);

    assert!(!store.set("k", &json!([1, 2, 3])));
    assert_eq!(store.get("k"), None);
    assert!(!store.remove("k"));
}

#[test]
fn full_jar_rejects_new_keys_but_keeps_existing() {
    let jar = DefaultCookieJar::with_policy(JarPolicy { max_cookies: Some(1), ..JarPolicy::default() }).into_handle();
    let store = store_on("https://app.example.com/", jar);

    assert!(store.set("a", "1"));
    assert!(!store.set("b", "2"));
    assert!(store.set("a", "3"));
    assert_eq!(store.get("a"), Some(json!("3")));
}
