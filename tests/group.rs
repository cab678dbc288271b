use std::sync::Arc;

use analytics_persist::cookies::{CookieStore, DefaultCookieJar, JarPolicy};
use analytics_persist::entity::{Entity, GroupEntity, Traits, GROUP_COOKIE_KEY};
use analytics_persist::storage::{InMemoryLocalStore, LocalStorage, LocalStore};
use serde_json::json;
use url::Url;

fn traits(v: serde_json::Value) -> Traits {
    v.as_object().cloned().expect("object")
}

#[test]
fn group_id_is_shared_across_subdomains() {
    let _ = env_logger::builder().is_test(true).try_init();
    let jar = DefaultCookieJar::new().into_handle();
    let local = InMemoryLocalStore::new();

    let app = Url::parse("https://app.example.com/").unwrap();
    let mut group = GroupEntity::new(
        Arc::new(CookieStore::new(app.clone(), jar.clone())),
        LocalStorage::new(local.area(&app.origin()).unwrap()),
        None,
    );
    group.identify(Some("acme"), Some(traits(json!({"plan": "enterprise"}))));

    // Another subdomain sees the id through the shared cookie, but local
    // storage is per origin, so traits start empty there.
    let www = Url::parse("https://www.example.com/").unwrap();
    let other = GroupEntity::new(
        Arc::new(CookieStore::new(www.clone(), jar)),
        LocalStorage::new(local.area(&www.origin()).unwrap()),
        None,
    );
    assert_eq!(other.id().as_deref(), Some("acme"));
    assert!(other.traits().is_empty());
}

#[cfg(feature = "sqlite_local_store")]
#[test]
fn group_survives_page_loads_with_durable_backends() {
    use std::sync::RwLock;

    use analytics_persist::cookies::PersistentCookieJar;
    use analytics_persist::entity::GROUP_TRAITS_KEY;
    use analytics_persist::storage::{SqliteLocalStore, StorageArea};
    use analytics_persist::CookieJarHandle;

    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let cookie_file = dir.path().join("cookies.json");
    let db = dir.path().join("local.db");
    let page = Url::parse("https://app.example.com/dashboard").unwrap();

    let load_page = || {
        let jar: CookieJarHandle = Arc::new(RwLock::new(PersistentCookieJar::open(&cookie_file, JarPolicy::default())));
        let local = SqliteLocalStore::new(db.to_str().unwrap()).unwrap();
        let cookies = Arc::new(CookieStore::new(page.clone(), jar));
        (
            GroupEntity::new(cookies.clone(), LocalStorage::new(local.area(&page.origin()).unwrap()), None),
            cookies,
            local,
        )
    };

    {
        let (mut group, _, _) = load_page();
        group.identify(Some("g-42"), Some(traits(json!({"seats": 12}))));
    }

    let (group, cookies, local) = load_page();
    assert_eq!(group.id().as_deref(), Some("g-42"));
    assert_eq!(group.traits(), traits(json!({"seats": 12})));
    assert_eq!(cookies.get(GROUP_COOKIE_KEY), Some(json!("g-42")));
    assert_eq!(cookies.options().domain.as_deref(), Some(".example.com"));

    let area = local.area(&page.origin()).unwrap();
    assert_eq!(area.get_item(GROUP_TRAITS_KEY).as_deref(), Some(r#"{"seats":12}"#));
}

#[test]
fn group_on_paas_host_still_persists() {
    let _ = env_logger::builder().is_test(true).try_init();
    let jar = DefaultCookieJar::with_policy(JarPolicy { reject_domain_cookies: true, ..JarPolicy::default() })
        .into_handle();
    let page = Url::parse("https://myapp.herokuapp.com/").unwrap();
    let cookies = Arc::new(CookieStore::new(page.clone(), jar));
    let area = InMemoryLocalStore::new().area(&page.origin()).unwrap();

    let mut group = GroupEntity::new(cookies.clone(), LocalStorage::new(area), None);
    group.identify(Some("g1"), None);

    assert_eq!(cookies.options().domain, None);
    assert_eq!(cookies.get(GROUP_COOKIE_KEY), Some(json!("g1")));

    group.reset();
    assert_eq!(group.id(), None);
    assert_eq!(cookies.get(GROUP_COOKIE_KEY), None);
}
