use std::env;
use std::fs;
use std::path::Path;

use serde::Serialize;
use toml::Value;

use clientele_core::config::{resolve_config_path, AppConfig, LoadOptions};

use crate::commands::{CommandResult, EXIT_CONFIG};

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries: Vec<ConfigEntry> = effective_values(&config)
        .into_iter()
        .map(|(key, env_keys, value)| ConfigEntry {
            key,
            value,
            source: field_source(
                key,
                env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        })
        .collect();

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.iter().map(render_line));

    match serde_json::to_value(&entries) {
        Ok(data) => CommandResult::success_with_data("config", lines.join("\n"), data),
        Err(_) => CommandResult::success("config", lines.join("\n")),
    }
}

type EnvKeys = &'static [&'static str];

fn effective_values(config: &AppConfig) -> Vec<(&'static str, EnvKeys, String)> {
    vec![
        ("database.url", &["CLIENTELE_DATABASE_URL"] as EnvKeys, config.database.url.clone()),
        (
            "database.max_connections",
            &["CLIENTELE_DATABASE_MAX_CONNECTIONS"] as EnvKeys,
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            &["CLIENTELE_DATABASE_TIMEOUT_SECS"] as EnvKeys,
            config.database.timeout_secs.to_string(),
        ),
        (
            "paging.default_page_size",
            &["CLIENTELE_PAGING_DEFAULT_PAGE_SIZE"] as EnvKeys,
            config.paging.default_page_size.to_string(),
        ),
        (
            "paging.max_page_size",
            &["CLIENTELE_PAGING_MAX_PAGE_SIZE"] as EnvKeys,
            config.paging.max_page_size.to_string(),
        ),
        (
            "logging.level",
            &["CLIENTELE_LOGGING_LEVEL", "CLIENTELE_LOG_LEVEL"] as EnvKeys,
            config.logging.level.clone(),
        ),
        (
            "logging.format",
            &["CLIENTELE_LOGGING_FORMAT", "CLIENTELE_LOG_FORMAT"] as EnvKeys,
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(entry: &ConfigEntry) -> String {
    format!("- {} = {} (source: {})", entry.key, entry.value, entry.source)
}
