//! `Set-Cookie` rendering and `document.cookie` parsing.
//!
//! Names and values are URI-component encoded on the wire, so JSON text
//! (quotes, commas, semicolons) survives the cookie grammar.

use std::borrow::Cow;

use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

use crate::config::CookieOptions;
use crate::errors::CookieError;

pub(crate) fn encode_component(s: &str) -> Cow<'_, str> {
    urlencoding::encode(s)
}

pub(crate) fn decode_component(s: &str) -> Result<String, CookieError> {
    urlencoding::decode(s)
        .map(Cow::into_owned)
        .map_err(|e| CookieError::Malformed(e.to_string()))
}

/// Renders the line a script assigns to `document.cookie`.
///
/// `value = None` renders a deletion: empty value, `Max-Age=0` and an
/// `Expires` at the epoch, under the same path and domain.
pub(crate) fn set_cookie_line(
    name: &str,
    value: Option<&str>,
    options: &CookieOptions,
) -> Result<String, CookieError> {
    let (value, max_age, expires) = match value {
        Some(v) => {
            let expires = time::Duration::try_from(options.max_age)
                .ok()
                .and_then(|d| OffsetDateTime::now_utc().checked_add(d))
                .ok_or_else(|| CookieError::Malformed("max_age out of range".into()))?;
            // rounded up: a sub-second lifetime must not render as Max-Age=0
            let max_age = options.max_age.as_millis().div_ceil(1000);
            (encode_component(v).into_owned(), max_age, expires)
        }
        None => (String::new(), 0, OffsetDateTime::UNIX_EPOCH),
    };
    let expires = expires
        .format(&Rfc2822)
        .map_err(|e| CookieError::Malformed(e.to_string()))?;

    let mut line = format!(
        "{}={}; Max-Age={}; Expires={}; Path={}",
        encode_component(name),
        value,
        max_age,
        expires,
        options.path
    );
    if let Some(domain) = &options.domain {
        line.push_str("; Domain=");
        line.push_str(domain);
    }
    if options.secure {
        line.push_str("; Secure");
    }
    line.push_str("; SameSite=");
    line.push_str(&options.same_site.to_string());

    Ok(line)
}

/// Finds the decoded value of `name` in a `"a=1; b=2"` cookie string.
///
/// Pairs that fail to decode are skipped. The first match wins.
pub(crate) fn find_cookie(cookie_string: &str, name: &str) -> Option<String> {
    cookie_string
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .filter_map(|(k, v)| {
            let k = decode_component(k.trim()).ok()?;
            (k == name).then_some(v)
        })
        .find_map(|v| decode_component(v.trim()).ok())
}
