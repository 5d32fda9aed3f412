use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::ClientConfig;

pub const DEFAULT_CONFIG_PATH: &str = "cityflow.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub session_db: String,
    pub request_timeout_secs: u64,
    pub logout_on_unauthorized: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            session_db: "sqlite://./data/session.db".into(),
            request_timeout_secs: 20,
            logout_on_unauthorized: true,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let config = ClientConfig::new(&self.base_url)
            .with_context(|| format!("invalid base url '{}'", self.base_url))?;
        Ok(config
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_logout_on_unauthorized(self.logout_on_unauthorized))
    }

    pub fn session_database_url(&self) -> String {
        normalize_database_url(&self.session_db)
    }
}

/// Defaults, then the TOML file at `path` if it exists, then the process environment.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };
    let get = |key: &str| file_cfg.get(key).and_then(value_text);

    if let Some(v) = get("base_url") {
        settings.base_url = v;
    }
    if let Some(v) = get("session_db") {
        settings.session_db = v;
    }
    if let Some(v) = get("request_timeout_secs") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = get("logout_on_unauthorized") {
        if let Some(parsed) = parse_flag(&v) {
            settings.logout_on_unauthorized = parsed;
        }
    }
    if let Some(v) = get("log_filter") {
        settings.log_filter = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("CITYFLOW_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = var("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = var("CITYFLOW_SESSION_DB") {
        settings.session_db = v;
    }
    if let Some(v) = var("APP__SESSION_DB") {
        settings.session_db = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = var("APP__LOGOUT_ON_UNAUTHORIZED") {
        if let Some(parsed) = parse_flag(&v) {
            settings.logout_on_unauthorized = parsed;
        }
    }

    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

fn value_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(text) => Some(text.clone()),
        toml::Value::Integer(number) => Some(number.to_string()),
        toml::Value::Boolean(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().session_db;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
