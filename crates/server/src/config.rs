use std::{collections::HashMap, fs, time::Duration};

use anyhow::Context;
use tracing::warn;

pub const DEFAULT_NOVAPOSHTA_API_URL: &str = "https://api.novaposhta.ua/v2.0/json/";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub novaposhta_api_url: String,
    pub novaposhta_api_key: String,
    pub carrier_timeout_secs: u64,
    pub city_search_limit: u32,
    pub warehouse_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8000".into(),
            novaposhta_api_url: DEFAULT_NOVAPOSHTA_API_URL.into(),
            novaposhta_api_key: String::new(),
            carrier_timeout_secs: 10,
            city_search_limit: 20,
            warehouse_limit: 500,
        }
    }
}

impl Settings {
    pub fn carrier_timeout(&self) -> Duration {
        Duration::from_secs(self.carrier_timeout_secs)
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let file = match fs::read_to_string("server.toml") {
        Ok(raw) => Some(raw),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => return Err(err).context("failed to read server.toml"),
    };
    settings_from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

/// File values override defaults; `APP__*` environment values override the file.
pub fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(raw)
            .context("server.toml is not a flat key/value table")?;
        for (key, value) in file_cfg {
            let value = match value {
                toml::Value::String(s) => s,
                other => other.to_string(),
            };
            apply(&mut settings, &key, value);
        }
    }

    for key in [
        "bind_addr",
        "novaposhta_api_url",
        "novaposhta_api_key",
        "carrier_timeout_secs",
        "city_search_limit",
        "warehouse_limit",
    ] {
        if let Some(value) = env(&format!("APP__{}", key.to_ascii_uppercase())) {
            apply(&mut settings, key, value);
        }
    }

    Ok(settings)
}

fn apply(settings: &mut Settings, key: &str, value: String) {
    match key {
        "bind_addr" => settings.server_bind = value,
        "novaposhta_api_url" => settings.novaposhta_api_url = value,
        "novaposhta_api_key" => settings.novaposhta_api_key = value,
        "carrier_timeout_secs" => parse_into(&mut settings.carrier_timeout_secs, key, &value),
        "city_search_limit" => parse_into(&mut settings.city_search_limit, key, &value),
        "warehouse_limit" => parse_into(&mut settings.warehouse_limit, key, &value),
        other => warn!(key = other, "config: ignoring unknown setting"),
    }
}

fn parse_into<T: std::str::FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value, "config: keeping default for malformed number"),
    }
}
