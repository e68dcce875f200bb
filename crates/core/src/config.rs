use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order::PENDING_ORDER_TTL_MINUTES;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub catalog: CatalogConfig,
    pub store: StoreConfig,
    pub funnel: FunnelConfig,
    pub context: ContextConfig,
    pub transport: TransportConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    /// Provider default when unset.
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub general_temperature: f32,
    pub intent_temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub source: CatalogSourceKind,
    pub base_url: String,
    pub path: Option<PathBuf>,
    pub source_key: String,
    /// Zero disables the periodic refresh; the catalog is then loaded once at startup.
    pub refresh_interval_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub store_name: String,
    pub seller_name: String,
    pub branch_code: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FunnelConfig {
    pub order_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ContextConfig {
    /// Zero keeps transcripts unbounded.
    pub max_transcript_chars: usize,
}

#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub kind: TransportKind,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSourceKind {
    Http,
    File,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Noop,
    Console,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub catalog_source: Option<CatalogSourceKind>,
    pub catalog_path: Option<PathBuf>,
    pub catalog_source_key: Option<String>,
    pub transport: Option<TransportKind>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://tendero.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Gemini,
                api_key: None,
                base_url: None,
                model: "gemini-1.5-flash".to_string(),
                timeout_secs: 20,
                general_temperature: 0.7,
                intent_temperature: 0.1,
                max_output_tokens: 1024,
            },
            catalog: CatalogConfig {
                source: CatalogSourceKind::Http,
                base_url: "https://api.99envios.app/api/inventarios".to_string(),
                path: None,
                source_key: String::new(),
                refresh_interval_secs: 0,
                timeout_secs: 15,
            },
            store: StoreConfig {
                store_name: "99envios".to_string(),
                seller_name: "Juan Manuel".to_string(),
                branch_code: None,
            },
            funnel: FunnelConfig {
                order_ttl_minutes: PENDING_ORDER_TTL_MINUTES,
                sweep_interval_secs: 300,
            },
            context: ContextConfig { max_transcript_chars: 16_000 },
            transport: TransportConfig { kind: TransportKind::Noop },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for CatalogSourceKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "file" => Ok(Self::File),
            other => Err(ConfigError::Validation(format!(
                "unsupported catalog source `{other}` (expected http|file)"
            ))),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "noop" => Ok(Self::Noop),
            "console" => Ok(Self::Console),
            other => Err(ConfigError::Validation(format!(
                "unsupported transport `{other}` (expected noop|console)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tendero.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(temperature) = llm.general_temperature {
                self.llm.general_temperature = temperature;
            }
            if let Some(temperature) = llm.intent_temperature {
                self.llm.intent_temperature = temperature;
            }
            if let Some(max_output_tokens) = llm.max_output_tokens {
                self.llm.max_output_tokens = max_output_tokens;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(source) = catalog.source {
                self.catalog.source = source;
            }
            if let Some(base_url) = catalog.base_url {
                self.catalog.base_url = base_url;
            }
            if let Some(path) = catalog.path {
                self.catalog.path = Some(path);
            }
            if let Some(source_key) = catalog.source_key {
                self.catalog.source_key = source_key;
            }
            if let Some(refresh_interval_secs) = catalog.refresh_interval_secs {
                self.catalog.refresh_interval_secs = refresh_interval_secs;
            }
            if let Some(timeout_secs) = catalog.timeout_secs {
                self.catalog.timeout_secs = timeout_secs;
            }
        }

        if let Some(store) = patch.store {
            if let Some(store_name) = store.store_name {
                self.store.store_name = store_name;
            }
            if let Some(seller_name) = store.seller_name {
                self.store.seller_name = seller_name;
            }
            if let Some(branch_code) = store.branch_code {
                self.store.branch_code = Some(branch_code);
            }
        }

        if let Some(funnel) = patch.funnel {
            if let Some(order_ttl_minutes) = funnel.order_ttl_minutes {
                self.funnel.order_ttl_minutes = order_ttl_minutes;
            }
            if let Some(sweep_interval_secs) = funnel.sweep_interval_secs {
                self.funnel.sweep_interval_secs = sweep_interval_secs;
            }
        }

        if let Some(context) = patch.context {
            if let Some(max_transcript_chars) = context.max_transcript_chars {
                self.context.max_transcript_chars = max_transcript_chars;
            }
        }

        if let Some(transport) = patch.transport {
            if let Some(kind) = transport.kind {
                self.transport.kind = kind;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TENDERO_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TENDERO_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("TENDERO_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TENDERO_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TENDERO_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TENDERO_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("TENDERO_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TENDERO_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("TENDERO_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("TENDERO_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("TENDERO_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TENDERO_LLM_GENERAL_TEMPERATURE") {
            self.llm.general_temperature = parse_f32("TENDERO_LLM_GENERAL_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("TENDERO_LLM_INTENT_TEMPERATURE") {
            self.llm.intent_temperature = parse_f32("TENDERO_LLM_INTENT_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("TENDERO_LLM_MAX_OUTPUT_TOKENS") {
            self.llm.max_output_tokens = parse_u32("TENDERO_LLM_MAX_OUTPUT_TOKENS", &value)?;
        }

        if let Some(value) = read_env("TENDERO_CATALOG_SOURCE") {
            self.catalog.source = value.parse()?;
        }
        if let Some(value) = read_env("TENDERO_CATALOG_BASE_URL") {
            self.catalog.base_url = value;
        }
        if let Some(value) = read_env("TENDERO_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("TENDERO_CATALOG_SOURCE_KEY") {
            self.catalog.source_key = value;
        }
        if let Some(value) = read_env("TENDERO_CATALOG_REFRESH_INTERVAL_SECS") {
            self.catalog.refresh_interval_secs =
                parse_u64("TENDERO_CATALOG_REFRESH_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("TENDERO_CATALOG_TIMEOUT_SECS") {
            self.catalog.timeout_secs = parse_u64("TENDERO_CATALOG_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TENDERO_STORE_NAME") {
            self.store.store_name = value;
        }
        if let Some(value) = read_env("TENDERO_STORE_SELLER_NAME") {
            self.store.seller_name = value;
        }
        if let Some(value) = read_env("TENDERO_STORE_BRANCH_CODE") {
            self.store.branch_code = Some(value);
        }

        if let Some(value) = read_env("TENDERO_FUNNEL_ORDER_TTL_MINUTES") {
            self.funnel.order_ttl_minutes = parse_i64("TENDERO_FUNNEL_ORDER_TTL_MINUTES", &value)?;
        }
        if let Some(value) = read_env("TENDERO_FUNNEL_SWEEP_INTERVAL_SECS") {
            self.funnel.sweep_interval_secs =
                parse_u64("TENDERO_FUNNEL_SWEEP_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("TENDERO_CONTEXT_MAX_TRANSCRIPT_CHARS") {
            self.context.max_transcript_chars =
                parse_usize("TENDERO_CONTEXT_MAX_TRANSCRIPT_CHARS", &value)?;
        }

        if let Some(value) = read_env("TENDERO_TRANSPORT") {
            self.transport.kind = value.parse()?;
        }

        if let Some(value) = read_env("TENDERO_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TENDERO_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("TENDERO_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("TENDERO_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("TENDERO_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("TENDERO_LOGGING_LEVEL").or_else(|| read_env("TENDERO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TENDERO_LOGGING_FORMAT").or_else(|| read_env("TENDERO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(catalog_source) = overrides.catalog_source {
            self.catalog.source = catalog_source;
        }
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = Some(catalog_path);
        }
        if let Some(catalog_source_key) = overrides.catalog_source_key {
            self.catalog.source_key = catalog_source_key;
        }
        if let Some(transport) = overrides.transport {
            self.transport.kind = transport;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_catalog(&self.catalog)?;
        validate_store(&self.store)?;
        validate_funnel(&self.funnel)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tendero.toml"), PathBuf::from("config/tendero.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    let temperatures = [
        ("llm.general_temperature", llm.general_temperature),
        ("llm.intent_temperature", llm.intent_temperature),
    ];
    for (key, temperature) in temperatures {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Validation(format!("{key} must be in range 0.0..=2.0")));
        }
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    match llm.provider {
        LlmProvider::Gemini | LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for gemini/openai providers (set TENDERO_LLM_API_KEY)"
                        .to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    match catalog.source {
        CatalogSourceKind::Http => {
            if !catalog.base_url.starts_with("http://") && !catalog.base_url.starts_with("https://")
            {
                return Err(ConfigError::Validation(
                    "catalog.base_url must start with http:// or https://".to_string(),
                ));
            }
            if catalog.source_key.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "catalog.source_key is required for the http catalog (the feed's branch code)"
                        .to_string(),
                ));
            }
        }
        CatalogSourceKind::File => {
            if catalog.path.is_none() {
                return Err(ConfigError::Validation(
                    "catalog.path is required when catalog.source = \"file\"".to_string(),
                ));
            }
        }
    }

    if catalog.timeout_secs == 0 || catalog.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "catalog.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    if store.store_name.trim().is_empty() || store.seller_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "store.store_name and store.seller_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_funnel(funnel: &FunnelConfig) -> Result<(), ConfigError> {
    if funnel.order_ttl_minutes <= 0 {
        return Err(ConfigError::Validation(
            "funnel.order_ttl_minutes must be greater than zero".to_string(),
        ));
    }
    if funnel.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "funnel.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    catalog: Option<CatalogPatch>,
    store: Option<StorePatch>,
    funnel: Option<FunnelPatch>,
    context: Option<ContextPatch>,
    transport: Option<TransportPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    general_temperature: Option<f32>,
    intent_temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    source: Option<CatalogSourceKind>,
    base_url: Option<String>,
    path: Option<PathBuf>,
    source_key: Option<String>,
    refresh_interval_secs: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    store_name: Option<String>,
    seller_name: Option<String>,
    branch_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FunnelPatch {
    order_ttl_minutes: Option<i64>,
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ContextPatch {
    max_transcript_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TransportPatch {
    kind: Option<TransportKind>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
