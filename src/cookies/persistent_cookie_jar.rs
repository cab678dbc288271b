use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::cookies::cookie_jar::{DefaultCookieJar, JarPolicy};
use crate::cookies::{Cookie, CookieJar};
use crate::errors::CookieError;

/// A `CookieJar` decorator that persists changes after each mutation.
///
/// This type is *transparent* for reads but *eagerly* writes a JSON snapshot
/// of the inner [`DefaultCookieJar`] after writes, so cookies survive
/// across page loads (process restarts).
pub struct PersistentCookieJar {
    /// Inner cookie jar that holds the actual cookie state.
    pub inner: DefaultCookieJar,
    /// JSON file the snapshot is written to.
    path: PathBuf,
}

impl PersistentCookieJar {
    /// Opens the jar stored at `path`, or starts empty when the file is
    /// missing or unreadable.
    pub fn open(path: impl Into<PathBuf>, policy: JarPolicy) -> Self {
        let path = path.into();
        let mut inner = match load(&path) {
            Ok(jar) => jar,
            Err(e) => {
                log::warn!("Cannot load cookie file {}: {e}; starting empty", path.display());
                DefaultCookieJar::new()
            }
        };
        inner.policy = policy;

        Self { inner, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshots the inner jar to disk.
    pub fn persist(&self) -> Result<(), CookieError> {
        let contents = serde_json::to_vec_pretty(&self.inner)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Persistence is best-effort: the in-memory state stays authoritative.
    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            log::error!("Cannot persist cookie file {}: {e}", self.path.display());
        }
    }
}

fn load(path: &Path) -> Result<DefaultCookieJar, CookieError> {
    if !path.exists() {
        return Ok(DefaultCookieJar::new());
    }
    let contents = fs::read(path)?;
    Ok(serde_json::from_slice(&contents)?)
}

impl CookieJar for PersistentCookieJar {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    /// Stores the cookie, then persists the updated state.
    fn store_cookie(&mut self, url: &Url, set_cookie: &str) -> Result<(), CookieError> {
        self.inner.store_cookie(url, set_cookie)?;
        self.persist_logged();
        Ok(())
    }

    fn get_document_cookies(&self, url: &Url) -> Option<String> {
        self.inner.get_document_cookies(url)
    }

    fn clear(&mut self) {
        self.inner.clear();
        self.persist_logged();
    }

    fn get_all_cookies(&self) -> Vec<Cookie> {
        self.inner.get_all_cookies()
    }

    fn remove_cookie(&mut self, url: &Url, cookie_name: &str) {
        self.inner.remove_cookie(url, cookie_name);
        self.persist_logged();
    }
}
