/// Errors raised while writing or reading cookies.
///
/// These never reach callers of [`CookieStore`](crate::cookies::CookieStore):
/// the store turns them into `false` / `None` results and logs them.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("Cannot encode or decode value: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cookies are disabled")]
    Disabled,

    #[error("Cookie rejected: {0}")]
    Rejected(String),

    #[error("Malformed cookie: {0}")]
    Malformed(String),

    #[error("Cookie jar is unavailable")]
    Poisoned,

    #[error("Cookie file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by local storage areas.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage quota exceeded ({needed} bytes needed, {quota} allowed)")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("Storage is disabled")]
    Disabled,

    #[error("Storage area is unavailable")]
    Poisoned,
}

/// Validation errors for cookie and entity overrides.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("path {0:?} must start with '/'")]
    InvalidPath(String),

    #[error("max_age must be greater than zero")]
    ZeroMaxAge,

    #[error("domain {0:?} is not a usable cookie domain")]
    InvalidDomain(String),

    #[error("{0} key must not be empty")]
    EmptyKey(&'static str),
}
