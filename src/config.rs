use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_SERVER_URL: &str = "http://localhost:8000/api";
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// API root, e.g. "https://plant.example.com/api"
    pub server_url: ConfigValue<String>,
    /// Bearer token sent with every request
    pub api_token: ConfigValue<Option<String>>,
    /// Page size for list commands that don't pass one
    pub page_size: ConfigValue<u32>,
    /// Per-request timeout
    pub timeout_secs: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    server_url: Option<String>,
    api_token: Option<String>,
    page_size: Option<u32>,
    timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut server_url = ConfigValue::new(DEFAULT_SERVER_URL.to_string(), ConfigSource::Default);
        let mut api_token = ConfigValue::new(None, ConfigSource::Default);
        let mut page_size = ConfigValue::new(DEFAULT_PAGE_SIZE, ConfigSource::Default);
        let mut timeout_secs = ConfigValue::new(DEFAULT_TIMEOUT_SECS, ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(url) = file_config.server_url {
                server_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(token) = file_config.api_token {
                api_token = ConfigValue::new(Some(token), ConfigSource::File);
            }
            if let Some(size) = file_config.page_size {
                page_size = ConfigValue::new(size, ConfigSource::File);
            }
            if let Some(secs) = file_config.timeout_secs {
                timeout_secs = ConfigValue::new(secs, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(url) = std::env::var("OPSBOARD_SERVER_URL") {
            server_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(token) = std::env::var("OPSBOARD_API_TOKEN") {
            api_token = ConfigValue::new(Some(token), ConfigSource::Environment);
        }
        if let Some(size) = env_number("OPSBOARD_PAGE_SIZE")? {
            page_size = ConfigValue::new(size, ConfigSource::Environment);
        }
        if let Some(secs) = env_number("OPSBOARD_TIMEOUT_SECS")? {
            timeout_secs = ConfigValue::new(secs, ConfigSource::Environment);
        }

        if page_size.value == 0 {
            return Err(ConfigError::InvalidValue(
                "page_size".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            server_url,
            api_token,
            page_size,
            timeout_secs,
            config_file,
        })
    }

    /// Copy safe to print: the token is masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.api_token.value.is_some() {
            config.api_token.value = Some("<redacted>".to_string());
        }
        config
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/opsboard/
    /// - macOS: ~/Library/Application Support/opsboard/
    /// - Windows: %APPDATA%/opsboard/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("opsboard")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, value) => {
                write!(f, "Invalid value for {}: {}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
