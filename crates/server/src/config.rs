use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub store_timeout_ms: u64,
    pub mailer_timeout_ms: u64,
    pub mailer_webhook_url: Option<String>,
    pub mailer_from: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            database_url: "sqlite://./data/contacts.db".into(),
            store_timeout_ms: 5_000,
            mailer_timeout_ms: 10_000,
            mailer_webhook_url: None,
            mailer_from: "intros@localhost".into(),
        }
    }
}

impl Settings {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn mailer_timeout(&self) -> Duration {
        Duration::from_millis(self.mailer_timeout_ms)
    }
}

/// Defaults, then `server.toml`, then the process environment.
pub fn load_settings() -> Settings {
    let file = fs::read_to_string("server.toml").ok();
    load_settings_from(file.as_deref(), |key| std::env::var(key).ok())
}

pub(crate) fn load_settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(file_cfg) = file.and_then(|raw| toml::from_str::<HashMap<String, String>>(raw).ok())
    {
        apply(&mut settings, |key| file_cfg.get(key).cloned());
    }
    apply(&mut settings, |key| {
        let upper = key.to_ascii_uppercase();
        env(&format!("APP__{upper}"))
            .or_else(|| legacy_env_name(key).and_then(|name| env(name)))
    });

    settings
}

fn legacy_env_name(key: &str) -> Option<&'static str> {
    match key {
        "bind_addr" => Some("SERVER_BIND"),
        "database_url" => Some("DATABASE_URL"),
        _ => None,
    }
}

fn apply(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("bind_addr") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("store_timeout_ms").and_then(|v| v.parse().ok()) {
        settings.store_timeout_ms = v;
    }
    if let Some(v) = lookup("mailer_timeout_ms").and_then(|v| v.parse().ok()) {
        settings.mailer_timeout_ms = v;
    }
    if let Some(v) = lookup("mailer_webhook_url") {
        settings.mailer_webhook_url = Some(v).filter(|url| !url.trim().is_empty());
    }
    if let Some(v) = lookup("mailer_from") {
        settings.mailer_from = v;
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    if let Some(parent) = sqlite_file(&database_url).and_then(Path::parent) {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create parent directory '{}' for database url '{database_url}'",
                parent.display()
            )
        })?;
    }
    Ok(database_url)
}

pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_database_url)
        .replace('\\', "/");
    format!("sqlite://{path}")
}

fn sqlite_file(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")?
        .split('?')
        .next()
        .filter(|path| !path.is_empty())?;
    Some(Path::new(path))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
