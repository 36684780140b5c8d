//! Cookie persistence: jars, attributes, the JSON envelope and change
//! notifications shared between owners of one jar.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

pub mod cookie;
pub mod envelope;
pub mod jar;
pub mod notify;

pub use cookie::{
    find_cookie, set_cookie_line, CookieOptions, SameSite, SetCookie, ONE_YEAR_SECONDS,
};
pub use envelope::{decode_envelope, encode_envelope};
pub use jar::{CookieJar, FileCookieJar, MemoryCookieJar};
pub use notify::{ChangeSource, StorageChangeHub};

/// Reads and decodes cookie `key`, falling back to `default` when it is
/// absent or cannot be decoded. Never fails.
pub fn read_cookie_value<T, J>(jar: &J, key: &str, default: T) -> T
where
    T: DeserializeOwned,
    J: CookieJar + ?Sized,
{
    let cookies = match jar.cookie_string() {
        Ok(cookies) => cookies,
        Err(err) => {
            warn!(key, "error reading cookie jar: {err:#}");
            return default;
        }
    };

    let Some(raw) = find_cookie(&cookies, key) else {
        return default;
    };

    match decode_envelope(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(key, "error reading cookie: {err}");
            default
        }
    }
}

/// Encodes `value` and stores it as cookie `key` with `options`.
pub fn write_cookie_value<T, J>(
    jar: &J,
    key: &str,
    value: &T,
    options: &CookieOptions,
) -> Result<()>
where
    T: Serialize,
    J: CookieJar + ?Sized,
{
    let encoded = encode_envelope(value).context("failed to encode cookie value")?;
    let line = set_cookie_line(key, &encoded, options)?;
    jar.set_cookie(&line)
        .with_context(|| format!("failed to store cookie '{key}'"))
}

pub fn cookie_exists<J: CookieJar + ?Sized>(jar: &J, key: &str) -> bool {
    jar.cookie_string()
        .map(|cookies| find_cookie(&cookies, key).is_some())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
