use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::DEFAULT_CONSENT_COOKIE;
use storage::{CookieOptions, SameSite};
use tracing::warn;

const DEFAULT_CONFIG_FILE: &str = "consent.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub cookie_name: String,
    pub cookie: CookieOptions,
    pub jar_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_CONSENT_COOKIE.into(),
            cookie: CookieOptions::default(),
            jar_path: PathBuf::from("./data/cookies.txt"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    cookie_name: Option<String>,
    cookie_path: Option<String>,
    cookie_domain: Option<String>,
    cookie_max_age: Option<i64>,
    cookie_same_site: Option<String>,
    cookie_secure: Option<bool>,
    jar_path: Option<PathBuf>,
}

/// Defaults, then `consent.toml` (or `config_path`), then environment.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_FILE) {
                if let Err(err) = apply_file(&mut settings, &raw) {
                    warn!("ignoring {DEFAULT_CONFIG_FILE}: {err:#}");
                }
            }
        }
    }

    apply_env(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.cookie_name {
        settings.cookie_name = v;
    }
    if let Some(v) = file_cfg.cookie_path {
        settings.cookie.path = Some(v);
    }
    if let Some(v) = file_cfg.cookie_domain {
        settings.cookie.domain = Some(v);
    }
    if let Some(v) = file_cfg.cookie_max_age {
        settings.cookie.max_age = Some(v);
    }
    if let Some(v) = file_cfg.cookie_same_site {
        settings.cookie.same_site = Some(v.parse::<SameSite>()?);
    }
    if let Some(v) = file_cfg.cookie_secure {
        settings.cookie.secure = v;
    }
    if let Some(v) = file_cfg.jar_path {
        settings.jar_path = v;
    }

    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("CONSENT_COOKIE_NAME") {
        settings.cookie_name = v;
    }
    if let Some(v) = var("APP__COOKIE_NAME") {
        settings.cookie_name = v;
    }

    if let Some(v) = var("APP__COOKIE_PATH") {
        settings.cookie.path = Some(v);
    }
    if let Some(v) = var("APP__COOKIE_DOMAIN") {
        settings.cookie.domain = Some(v);
    }

    if let Some(v) = var("APP__COOKIE_MAX_AGE") {
        match v.parse::<i64>() {
            Ok(parsed) => settings.cookie.max_age = Some(parsed),
            Err(_) => warn!("ignoring APP__COOKIE_MAX_AGE={v:?}: not an integer"),
        }
    }

    if let Some(v) = var("APP__COOKIE_SAME_SITE") {
        match v.parse::<SameSite>() {
            Ok(parsed) => settings.cookie.same_site = Some(parsed),
            Err(err) => warn!("ignoring APP__COOKIE_SAME_SITE: {err}"),
        }
    }

    if let Some(v) = var("APP__COOKIE_SECURE") {
        match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => settings.cookie.secure = true,
            "0" | "false" | "no" => settings.cookie.secure = false,
            _ => warn!("ignoring APP__COOKIE_SECURE={v:?}: not a boolean"),
        }
    }

    if let Some(v) = var("CONSENT_JAR_PATH") {
        settings.jar_path = PathBuf::from(v);
    }
    if let Some(v) = var("APP__JAR_PATH") {
        settings.jar_path = PathBuf::from(v);
    }
}
