use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tendero_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// One rendered setting: dotted TOML path, display value, overriding env variable.
struct Entry {
    key: &'static str,
    value: String,
    env_key: &'static str,
}

fn entry(key: &'static str, value: impl ToString, env_key: &'static str) -> Entry {
    Entry { key, value: value.to_string(), env_key }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries(&config).into_iter().map(|entry| {
        let source = field_source(
            entry.key,
            entry.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        render_line(entry.key, &entry.value, source)
    }));

    lines.join("\n")
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let catalog_path = config
        .catalog
        .path
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        entry("database.url", &config.database.url, "TENDERO_DATABASE_URL"),
        entry(
            "database.max_connections",
            config.database.max_connections,
            "TENDERO_DATABASE_MAX_CONNECTIONS",
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs,
            "TENDERO_DATABASE_TIMEOUT_SECS",
        ),
        entry("llm.provider", format!("{:?}", config.llm.provider), "TENDERO_LLM_PROVIDER"),
        entry("llm.model", &config.llm.model, "TENDERO_LLM_MODEL"),
        entry(
            "llm.base_url",
            config.llm.base_url.as_deref().unwrap_or("<provider default>"),
            "TENDERO_LLM_BASE_URL",
        ),
        entry("llm.api_key", llm_api_key, "TENDERO_LLM_API_KEY"),
        entry("llm.timeout_secs", config.llm.timeout_secs, "TENDERO_LLM_TIMEOUT_SECS"),
        entry("catalog.source", format!("{:?}", config.catalog.source), "TENDERO_CATALOG_SOURCE"),
        entry("catalog.base_url", &config.catalog.base_url, "TENDERO_CATALOG_BASE_URL"),
        entry("catalog.path", catalog_path, "TENDERO_CATALOG_PATH"),
        entry("catalog.source_key", &config.catalog.source_key, "TENDERO_CATALOG_SOURCE_KEY"),
        entry(
            "catalog.refresh_interval_secs",
            config.catalog.refresh_interval_secs,
            "TENDERO_CATALOG_REFRESH_INTERVAL_SECS",
        ),
        entry("store.store_name", &config.store.store_name, "TENDERO_STORE_NAME"),
        entry("store.seller_name", &config.store.seller_name, "TENDERO_STORE_SELLER_NAME"),
        entry(
            "store.branch_code",
            config.store.branch_code.as_deref().unwrap_or("<unset>"),
            "TENDERO_STORE_BRANCH_CODE",
        ),
        entry(
            "funnel.order_ttl_minutes",
            config.funnel.order_ttl_minutes,
            "TENDERO_FUNNEL_ORDER_TTL_MINUTES",
        ),
        entry(
            "funnel.sweep_interval_secs",
            config.funnel.sweep_interval_secs,
            "TENDERO_FUNNEL_SWEEP_INTERVAL_SECS",
        ),
        entry(
            "context.max_transcript_chars",
            config.context.max_transcript_chars,
            "TENDERO_CONTEXT_MAX_TRANSCRIPT_CHARS",
        ),
        entry("transport.kind", format!("{:?}", config.transport.kind), "TENDERO_TRANSPORT"),
        entry("server.bind_address", &config.server.bind_address, "TENDERO_SERVER_BIND_ADDRESS"),
        entry(
            "server.health_check_port",
            config.server.health_check_port,
            "TENDERO_SERVER_HEALTH_CHECK_PORT",
        ),
        entry("logging.level", &config.logging.level, "TENDERO_LOGGING_LEVEL"),
        entry("logging.format", format!("{:?}", config.logging.format), "TENDERO_LOGGING_FORMAT"),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("tendero.toml"), PathBuf::from("config/tendero.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
