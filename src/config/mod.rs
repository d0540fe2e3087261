//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! environment variables prefixed with `RESEARCH_PROMPTS` (nested keys use
//! `__`, e.g. `RESEARCH_PROMPTS_PROMPTS__REQUIRE_SESSION_ID=true`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! name = "research-prompts"
//! host = "127.0.0.1"
//! port = 3000
//!
//! [prompts]
//! default_expertise_level = "intermediate"
//! require_session_id = false
//! max_sessions = 1024               # 0 = unlimited
//! session_idle_timeout_secs = 3600  # 0 = never expire
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::prompts::{
    SessionLimits, DEFAULT_EXPERTISE_LEVEL, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS,
};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "RESEARCH_PROMPTS";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// MCP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Prompt and research context settings
    #[serde(default)]
    pub prompts: PromptsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MCP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server name reported to MCP clients
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Host to bind to in HTTP mode
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to in HTTP mode
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_server_name() -> String {
    "research-prompts".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Prompt configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Expertise level given to a new research context
    #[serde(default = "default_expertise_level")]
    pub default_expertise_level: String,

    /// Reject `prompts/get` calls without a session id instead of sharing
    /// the default context between them
    #[serde(default)]
    pub require_session_id: bool,

    /// Most session contexts held at once (0 = unlimited)
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Seconds of inactivity before a session context is dropped (0 = never)
    #[serde(default = "default_session_idle_timeout_secs")]
    pub session_idle_timeout_secs: u64,
}

impl PromptsConfig {
    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            max_sessions: Some(self.max_sessions).filter(|&n| n > 0),
            idle_timeout: Some(self.session_idle_timeout_secs)
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        }
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            default_expertise_level: default_expertise_level(),
            require_session_id: false,
            max_sessions: default_max_sessions(),
            session_idle_timeout_secs: default_session_idle_timeout_secs(),
        }
    }
}

fn default_expertise_level() -> String {
    DEFAULT_EXPERTISE_LEVEL.to_string()
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_session_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT.as_secs()
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log line format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    build(Some(path))
}

/// Get the configuration from defaults and environment variables only
pub fn get_config() -> Result<Config, ConfigError> {
    build(None)
}

fn build(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Default config file location (`<config dir>/research-prompts/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("research-prompts").join("config.toml"))
}

/// Find a config file in the working directory or the default location
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("research-prompts.toml");
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}
