//! Gateway configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Client-facing network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Backend service settings.
    #[serde(default)]
    pub services: ServicesConfig,

    /// Transcript persistence settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Reply loop settings.
    #[serde(default)]
    pub reply: ReplyConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the client-facing HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Where the backend service sockets live and how links to them heal.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    /// Directory holding the `service-<name>.socket` files.
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,

    /// Delay before re-establishing a dropped service link.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl ServicesConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// Transcript persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Path of the persisted transcript file.
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

/// Reply loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyConfig {
    /// Polling interval of the autonomous reply loop.
    #[serde(default = "default_reply_interval_secs")]
    pub interval_secs: u64,

    /// Output-length hint passed to the generation service.
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
}

impl ReplyConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "parley_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_socket_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_reconnect_delay_secs() -> u64 {
    3
}

fn default_history_path() -> PathBuf {
    PathBuf::from("data/history.json")
}

fn default_reply_interval_secs() -> u64 {
    5
}

fn default_max_new_tokens() -> u32 {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            socket_dir: default_socket_dir(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reply_interval_secs(),
            max_new_tokens: default_max_new_tokens(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PARLEY_HOST` overrides `server.host`
/// - `PARLEY_PORT` overrides `server.port`
/// - `PARLEY_SOCKET_DIR` overrides `services.socket_dir`
/// - `PARLEY_HISTORY_PATH` overrides `history.path`
/// - `PARLEY_LOG_LEVEL` overrides `logging.level`
/// - `PARLEY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

impl Config {
    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(host) = get("PARLEY_HOST") {
            if let Ok(parsed) = host.parse() {
                self.server.host = parsed;
            }
        }
        if let Some(port) = get("PARLEY_PORT") {
            if let Ok(parsed) = port.parse() {
                self.server.port = parsed;
            }
        }
        if let Some(dir) = get("PARLEY_SOCKET_DIR") {
            self.services.socket_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("PARLEY_HISTORY_PATH") {
            self.history.path = PathBuf::from(path);
        }
        if let Some(level) = get("PARLEY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = get("PARLEY_LOG_JSON") {
            self.logging.json = json == "true" || json == "1";
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.services.socket_dir, PathBuf::from("data"));
        assert_eq!(config.services.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(config.reply.interval(), Duration::from_secs(5));
        assert_eq!(config.reply.max_new_tokens, 256);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [reply]
            max_new_tokens = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.reply.max_new_tokens, 64);
        // Untouched sections keep their defaults.
        assert_eq!(config.reply.interval_secs, 5);
        assert_eq!(config.history.path, PathBuf::from("data/history.json"));
    }

    #[test]
    fn env_overrides_win() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "PARLEY_PORT" => Some("8080".to_string()),
            "PARLEY_SOCKET_DIR" => Some("/run/parley".to_string()),
            "PARLEY_LOG_JSON" => Some("true".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.services.socket_dir, PathBuf::from("/run/parley"));
        assert!(config.logging.json);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "PARLEY_PORT" => Some("not-a-port".to_string()),
            "PARLEY_HOST" => Some("not-an-ip".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, default_host());
    }
}
