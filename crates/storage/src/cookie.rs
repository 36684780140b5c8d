use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::error::CookieError;

pub const ONE_YEAR_SECONDS: i64 = 365 * 24 * 60 * 60;

const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        };
        f.write_str(value)
    }
}

impl FromStr for SameSite {
    type Err = CookieError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            _ => Err(CookieError::InvalidAttribute {
                attribute: "samesite",
                value: value.to_string(),
            }),
        }
    }
}

/// Attributes written alongside a cookie value.
///
/// `Default` gives the consent cookie attributes: `path=/`, one year
/// `max-age` and `samesite=Strict`. Use [`CookieOptions::empty`] for a bare
/// session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: Some("/".into()),
            domain: None,
            max_age: Some(ONE_YEAR_SECONDS),
            expires: None,
            secure: false,
            same_site: Some(SameSite::Strict),
        }
    }
}

impl CookieOptions {
    pub fn empty() -> Self {
        Self {
            path: None,
            domain: None,
            max_age: None,
            expires: None,
            secure: false,
            same_site: None,
        }
    }

    /// Serializes the attributes as `; name=value` pairs, or `""` when none
    /// are set. A zero `max-age` is left out.
    pub fn attribute_string(&self) -> String {
        let mut parts = Vec::new();

        if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
            parts.push(format!("path={path}"));
        }
        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            parts.push(format!("domain={domain}"));
        }
        if let Some(max_age) = self.max_age.filter(|age| *age != 0) {
            parts.push(format!("max-age={max_age}"));
        }
        if let Some(expires) = self.expires {
            parts.push(format!("expires={}", expires.format(EXPIRES_FORMAT)));
        }
        if self.secure {
            parts.push("secure".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("samesite={same_site}"));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!("; {}", parts.join("; "))
        }
    }
}

/// Builds the line handed to a jar, e.g. `name=value; path=/`.
pub fn set_cookie_line(
    name: &str,
    value: &str,
    options: &CookieOptions,
) -> Result<String, CookieError> {
    validate_name(name)?;
    Ok(format!("{name}={value}{}", options.attribute_string()))
}

/// Finds the value of `name` in a `name=value; other=value` cookie string.
pub fn find_cookie<'a>(cookie_string: &'a str, name: &str) -> Option<&'a str> {
    cookie_string
        .split(';')
        .map(str::trim_start)
        .find_map(|entry| match entry.split_once('=') {
            Some((entry_name, value)) if entry_name == name => Some(value),
            _ => None,
        })
}

/// A parsed `Set-Cookie` style line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl SetCookie {
    pub fn parse(line: &str) -> Result<Self, CookieError> {
        let mut segments = line.split(';');
        let pair = segments.next().unwrap_or_default().trim();
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| CookieError::MissingPair(line.to_string()))?;
        let name = name.trim();
        validate_name(name)?;

        let mut options = CookieOptions::empty();
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (attribute, raw) = match segment.split_once('=') {
                Some((attribute, raw)) => (attribute.trim(), raw.trim()),
                None => (segment, ""),
            };
            match attribute.to_ascii_lowercase().as_str() {
                "path" => options.path = Some(raw.to_string()),
                "domain" => options.domain = Some(raw.to_string()),
                "max-age" => {
                    let max_age = raw.parse::<i64>().map_err(|_| {
                        CookieError::InvalidAttribute {
                            attribute: "max-age",
                            value: raw.to_string(),
                        }
                    })?;
                    options.max_age = Some(max_age);
                }
                "expires" => {
                    let expires = DateTime::parse_from_rfc2822(raw).map_err(|_| {
                        CookieError::InvalidAttribute {
                            attribute: "expires",
                            value: raw.to_string(),
                        }
                    })?;
                    options.expires = Some(expires.with_timezone(&Utc));
                }
                "secure" => options.secure = true,
                "samesite" => options.same_site = Some(raw.parse()?),
                _ => {}
            }
        }

        Ok(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            options,
        })
    }

    /// Whether applying this line removes the cookie instead of storing it.
    /// `max-age` takes precedence over `expires`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match (self.options.max_age, self.options.expires) {
            (Some(max_age), _) => max_age <= 0,
            (None, Some(expires)) => expires <= now,
            (None, None) => false,
        }
    }
}

fn validate_name(name: &str) -> Result<(), CookieError> {
    let invalid = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '=' | ';' | ','));
    if invalid {
        return Err(CookieError::InvalidName(name.to_string()));
    }
    Ok(())
}
