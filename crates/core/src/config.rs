use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locale::Locale;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub primary: ProviderConfig,
    pub secondary: ProviderConfig,
    pub chat: ChatConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}

/// One chat-completion endpoint. Two of these are configured; the gateway
/// fails over from primary to secondary exactly once per request.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Conversation-memory cap, counted in turns.
    pub history_cap: usize,
    /// How many catalog items are enumerated in the system prompt. Items
    /// past this bound stay reachable through keyword search only.
    pub catalog_prompt_limit: usize,
    pub locale: Locale,
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Quiet window after the last seller message before summarizing.
    pub debounce_secs: u64,
    /// Upper bound on total buffering delay; a steady trickle of messages
    /// cannot postpone the summary past this.
    pub max_batch_delay_secs: u64,
    pub buffer_cap: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub primary_endpoint: Option<String>,
    pub primary_api_key: Option<String>,
    pub primary_model: Option<String>,
    pub secondary_endpoint: Option<String>,
    pub secondary_api_key: Option<String>,
    pub secondary_model: Option<String>,
    pub locale: Option<Locale>,
    pub log_level: Option<String>,
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
            primary: ProviderConfig {
                endpoint:
                    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
                        .to_string(),
                api_key: None,
                model: "gemini-2.5-flash".to_string(),
                timeout_secs: 30,
            },
            secondary: ProviderConfig {
                endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
            },
            chat: ChatConfig {
                temperature: 0.3,
                max_tokens: 512,
                history_cap: 10,
                catalog_prompt_limit: 50,
                locale: Locale::English,
            },
            relay: RelayConfig { debounce_secs: 5, max_batch_delay_secs: 15, buffer_cap: 20 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("lapak.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(provider) = patch.provider {
            if let Some(primary) = provider.primary {
                apply_provider_patch(&mut self.primary, primary);
            }
            if let Some(secondary) = provider.secondary {
                apply_provider_patch(&mut self.secondary, secondary);
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(temperature) = chat.temperature {
                self.chat.temperature = temperature;
            }
            if let Some(max_tokens) = chat.max_tokens {
                self.chat.max_tokens = max_tokens;
            }
            if let Some(history_cap) = chat.history_cap {
                self.chat.history_cap = history_cap;
            }
            if let Some(catalog_prompt_limit) = chat.catalog_prompt_limit {
                self.chat.catalog_prompt_limit = catalog_prompt_limit;
            }
            if let Some(locale) = chat.locale.as_deref().and_then(Locale::parse) {
                self.chat.locale = locale;
            }
        }

        if let Some(relay) = patch.relay {
            if let Some(debounce_secs) = relay.debounce_secs {
                self.relay.debounce_secs = debounce_secs;
            }
            if let Some(max_batch_delay_secs) = relay.max_batch_delay_secs {
                self.relay.max_batch_delay_secs = max_batch_delay_secs;
            }
            if let Some(buffer_cap) = relay.buffer_cap {
                self.relay.buffer_cap = buffer_cap;
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
        if let Some(value) = read_env("LAPAK_PRIMARY_ENDPOINT") {
            self.primary.endpoint = value;
        }
        if let Some(value) = read_env("LAPAK_PRIMARY_API_KEY") {
            self.primary.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LAPAK_PRIMARY_MODEL") {
            self.primary.model = value;
        }
        if let Some(value) = read_env("LAPAK_PRIMARY_TIMEOUT_SECS") {
            self.primary.timeout_secs = parse_u64("LAPAK_PRIMARY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LAPAK_SECONDARY_ENDPOINT") {
            self.secondary.endpoint = value;
        }
        if let Some(value) = read_env("LAPAK_SECONDARY_API_KEY") {
            self.secondary.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LAPAK_SECONDARY_MODEL") {
            self.secondary.model = value;
        }
        if let Some(value) = read_env("LAPAK_SECONDARY_TIMEOUT_SECS") {
            self.secondary.timeout_secs = parse_u64("LAPAK_SECONDARY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LAPAK_CHAT_LOCALE") {
            self.chat.locale = Locale::parse(&value).ok_or(ConfigError::InvalidEnvOverride {
                key: "LAPAK_CHAT_LOCALE".to_string(),
                value,
            })?;
        }
        if let Some(value) = read_env("LAPAK_CHAT_HISTORY_CAP") {
            self.chat.history_cap = parse_usize("LAPAK_CHAT_HISTORY_CAP", &value)?;
        }

        if let Some(value) = read_env("LAPAK_RELAY_DEBOUNCE_SECS") {
            self.relay.debounce_secs = parse_u64("LAPAK_RELAY_DEBOUNCE_SECS", &value)?;
        }

        let log_level = read_env("LAPAK_LOGGING_LEVEL").or_else(|| read_env("LAPAK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("LAPAK_LOGGING_FORMAT").or_else(|| read_env("LAPAK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(endpoint) = overrides.primary_endpoint {
            self.primary.endpoint = endpoint;
        }
        if let Some(api_key) = overrides.primary_api_key {
            self.primary.api_key = Some(secret_value(api_key));
        }
        if let Some(model) = overrides.primary_model {
            self.primary.model = model;
        }
        if let Some(endpoint) = overrides.secondary_endpoint {
            self.secondary.endpoint = endpoint;
        }
        if let Some(api_key) = overrides.secondary_api_key {
            self.secondary.api_key = Some(secret_value(api_key));
        }
        if let Some(model) = overrides.secondary_model {
            self.secondary.model = model;
        }
        if let Some(locale) = overrides.locale {
            self.chat.locale = locale;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_provider("provider.primary", &self.primary)?;
        validate_provider("provider.secondary", &self.secondary)?;
        validate_chat(&self.chat)?;
        validate_relay(&self.relay)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_provider_patch(config: &mut ProviderConfig, patch: ProviderPatch) {
    if let Some(endpoint) = patch.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(api_key) = patch.api_key {
        config.api_key = Some(secret_value(api_key));
    }
    if let Some(model) = patch.model {
        config.model = model;
    }
    if let Some(timeout_secs) = patch.timeout_secs {
        config.timeout_secs = timeout_secs;
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("lapak.toml"), PathBuf::from("config/lapak.toml")]
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

fn validate_provider(section: &str, provider: &ProviderConfig) -> Result<(), ConfigError> {
    let endpoint = provider.endpoint.trim();
    if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
        return Err(ConfigError::Validation(format!(
            "{section}.endpoint must start with http:// or https://"
        )));
    }

    if provider.model.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{section}.model must not be empty")));
    }

    if provider.timeout_secs == 0 || provider.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "{section}.timeout_secs must be in range 1..=300"
        )));
    }

    if let Some(api_key) = &provider.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{section}.api_key must not be blank when present"
            )));
        }
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if !(0.0..=2.0).contains(&chat.temperature) {
        return Err(ConfigError::Validation(
            "chat.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }
    if chat.max_tokens == 0 {
        return Err(ConfigError::Validation("chat.max_tokens must be greater than zero".to_string()));
    }
    if chat.history_cap == 0 {
        return Err(ConfigError::Validation(
            "chat.history_cap must be greater than zero".to_string(),
        ));
    }
    if chat.catalog_prompt_limit == 0 {
        return Err(ConfigError::Validation(
            "chat.catalog_prompt_limit must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_relay(relay: &RelayConfig) -> Result<(), ConfigError> {
    if relay.debounce_secs == 0 {
        return Err(ConfigError::Validation(
            "relay.debounce_secs must be greater than zero".to_string(),
        ));
    }
    if relay.max_batch_delay_secs < relay.debounce_secs {
        return Err(ConfigError::Validation(
            "relay.max_batch_delay_secs must be at least relay.debounce_secs".to_string(),
        ));
    }
    if relay.buffer_cap == 0 {
        return Err(ConfigError::Validation(
            "relay.buffer_cap must be greater than zero".to_string(),
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

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    provider: Option<ProviderSectionPatch>,
    chat: Option<ChatPatch>,
    relay: Option<RelayPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderSectionPatch {
    primary: Option<ProviderPatch>,
    secondary: Option<ProviderPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderPatch {
    endpoint: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    history_cap: Option<usize>,
    catalog_prompt_limit: Option<usize>,
    locale: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RelayPatch {
    debounce_secs: Option<u64>,
    max_batch_delay_secs: Option<u64>,
    buffer_cap: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
