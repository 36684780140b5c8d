//! Cookie jars modelled on `document.cookie`: reads return every live cookie
//! as `name=value; name=value`, writes take one `Set-Cookie` style line.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use shared::protocol::StorageChange;

use crate::{cookie::SetCookie, notify::StorageChangeHub};

pub trait CookieJar {
    fn cookie_string(&self) -> Result<String>;
    fn set_cookie(&self, line: &str) -> Result<()>;

    /// Tag this handle puts on the changes it publishes, if it publishes any.
    fn writer_id(&self) -> Option<u64> {
        None
    }
}

impl<J: CookieJar + ?Sized> CookieJar for &J {
    fn cookie_string(&self) -> Result<String> {
        (**self).cookie_string()
    }

    fn set_cookie(&self, line: &str) -> Result<()> {
        (**self).set_cookie(line)
    }

    fn writer_id(&self) -> Option<u64> {
        (**self).writer_id()
    }
}

impl<J: CookieJar + ?Sized> CookieJar for Arc<J> {
    fn cookie_string(&self) -> Result<String> {
        (**self).cookie_string()
    }

    fn set_cookie(&self, line: &str) -> Result<()> {
        (**self).set_cookie(line)
    }

    fn writer_id(&self) -> Option<u64> {
        (**self).writer_id()
    }
}

/// Ordered `name -> value` entries; replacing a cookie keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CookieEntries(Vec<(String, String)>);

impl CookieEntries {
    fn parse_lines(raw: &str) -> Self {
        let entries = raw
            .lines()
            .filter_map(|line| line.trim().split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self(entries)
    }

    fn render(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Applies a parsed line and reports what other observers should see.
    fn apply(&mut self, cookie: SetCookie) -> Option<StorageChange> {
        let position = self.0.iter().position(|(name, _)| *name == cookie.name);

        if cookie.is_expired_at(Utc::now()) {
            let index = position?;
            self.0.remove(index);
            return Some(StorageChange::removed(cookie.name));
        }

        let change = StorageChange::updated(cookie.name.clone(), cookie.value.clone());
        match position {
            Some(index) => self.0[index].1 = cookie.value,
            None => self.0.push((cookie.name, cookie.value)),
        }
        Some(change)
    }
}

static NEXT_WRITER: AtomicU64 = AtomicU64::new(1);

fn next_writer() -> u64 {
    NEXT_WRITER.fetch_add(1, Ordering::Relaxed)
}

/// In-memory jar. Clones share the same cookies, like tabs of one browser
/// profile; attach a [`StorageChangeHub`] to let the other tabs hear writes.
/// Every clone is a separate tab with its own writer id.
#[derive(Debug)]
pub struct MemoryCookieJar {
    entries: Arc<Mutex<CookieEntries>>,
    hub: Option<StorageChangeHub>,
    writer: u64,
}

impl Default for MemoryCookieJar {
    fn default() -> Self {
        Self {
            entries: Arc::default(),
            hub: None,
            writer: next_writer(),
        }
    }
}

impl Clone for MemoryCookieJar {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            hub: self.hub.clone(),
            writer: next_writer(),
        }
    }
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_change_hub(mut self, hub: StorageChangeHub) -> Self {
        self.hub = Some(hub);
        self
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, CookieEntries>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory cookie jar lock poisoned"))
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookie_string(&self) -> Result<String> {
        Ok(self.entries()?.render("; "))
    }

    fn set_cookie(&self, line: &str) -> Result<()> {
        let cookie = SetCookie::parse(line)?;
        let change = self.entries()?.apply(cookie);
        if let (Some(hub), Some(change)) = (&self.hub, change) {
            hub.publish(change.from_writer(self.writer));
        }
        Ok(())
    }

    fn writer_id(&self) -> Option<u64> {
        self.hub.as_ref().map(|_| self.writer)
    }
}

/// Jar persisted as one `name=value` line per cookie.
#[derive(Debug, Clone)]
pub struct FileCookieJar {
    path: PathBuf,
}

impl FileCookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<CookieEntries> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(CookieEntries::parse_lines(&raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(CookieEntries::default()),
            Err(err) => Err(err).with_context(|| {
                format!("failed to read cookie jar '{}'", self.path.display())
            }),
        }
    }

    fn store(&self, entries: &CookieEntries) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create parent directory '{}' for cookie jar",
                    parent.display()
                )
            })?;
        }

        let mut raw = entries.render("\n");
        if !raw.is_empty() {
            raw.push('\n');
        }
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write cookie jar '{}'", self.path.display()))
    }
}

impl CookieJar for FileCookieJar {
    fn cookie_string(&self) -> Result<String> {
        Ok(self.load()?.render("; "))
    }

    fn set_cookie(&self, line: &str) -> Result<()> {
        let cookie = SetCookie::parse(line)?;
        let mut entries = self.load()?;
        if entries.apply(cookie).is_some() {
            self.store(&entries)?;
        }
        Ok(())
    }
}
