//! Configuration management for the Deckhand daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/deckhand/config.toml`.
//! Environment variables (`DECKHAND_*`) override file values after load;
//! the resolved configuration is validated once at startup and then passed
//! into each component's constructor — request handlers never read
//! configuration from global state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("bind_addr is not a valid socket address: {0}")]
    InvalidBindAddr(String),

    #[error("max_body_size must be greater than 0, got {0}")]
    InvalidMaxBodySize(u64),

    #[error("{0} must not be empty")]
    EmptyValue(&'static str),

    #[error("server port must not be 0")]
    InvalidServerPort,

    #[error("{0} must be greater than 0 seconds")]
    InvalidTimeout(&'static str),

    #[error("image_marker must not be empty when no fixed runtime unit is set")]
    MissingImageMarker,
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the Deckhand daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General daemon configuration.
    pub daemon: DaemonConfig,

    /// HTTP listener configuration.
    pub http: HttpConfig,

    /// Confined directory roots.
    pub paths: PathsConfig,

    /// The managed game server's address for status probes.
    pub server: ServerConfig,

    /// Container runtime integration.
    pub runtime: RuntimeConfig,
}

/// General daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Address the HTTP service binds to.
    pub bind_addr: String,

    /// Maximum request body size in bytes (bounds multipart uploads).
    pub max_body_size: u64,
}

/// The two confined directory roots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the mod archives.
    pub mods_dir: PathBuf,

    /// Root of the general-purpose file subtree.
    pub files_dir: PathBuf,
}

/// Address and timeout for status queries against the game server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Hostname the game server listens on.
    pub host: String,

    /// Port the game server listens on.
    pub port: u16,

    /// Per-attempt timeout for one status query, in seconds.
    pub status_timeout_secs: u64,
}

/// Container runtime integration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Runtime CLI binary (`docker`-compatible; `podman` works unchanged).
    pub binary: String,

    /// Fixed unit (container) identifier. Unset enables discovery mode.
    pub unit: Option<String>,

    /// Image-name substring used to discover the server's unit.
    pub image_marker: String,

    /// Timeout for the restart command, in seconds.
    pub restart_timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            max_body_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            mods_dir: PathBuf::from("/data/mods"),
            files_dir: PathBuf::from("/data"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25565,
            status_timeout_secs: 5,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            unit: None,
            image_marker: "minecraft-server".to_string(),
            restart_timeout_secs: 30,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deckhand")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Empty values are ignored; unparseable numbers are ignored with a
    /// warning. Supported variables:
    /// - DECKHAND_LOG_LEVEL: Override log level
    /// - DECKHAND_BIND_ADDR: Override the HTTP bind address
    /// - DECKHAND_MODS_DIR: Override the mod directory
    /// - DECKHAND_FILES_DIR: Override the general-files root
    /// - DECKHAND_SERVER_HOST: Override the game server host
    /// - DECKHAND_SERVER_PORT: Override the game server port
    /// - DECKHAND_RUNTIME_BINARY: Override the container runtime binary
    /// - DECKHAND_RUNTIME_UNIT: Pin the runtime unit (disables discovery)
    /// - DECKHAND_IMAGE_MARKER: Override the discovery image marker
    pub fn apply_env_overrides(&mut self) {
        if let Some(level) = non_empty_env("DECKHAND_LOG_LEVEL") {
            tracing::info!("Overriding log_level from environment: {}", level);
            self.daemon.log_level = level;
        }

        if let Some(addr) = non_empty_env("DECKHAND_BIND_ADDR") {
            tracing::info!("Overriding bind_addr from environment: {}", addr);
            self.http.bind_addr = addr;
        }

        if let Some(dir) = non_empty_env("DECKHAND_MODS_DIR") {
            tracing::info!("Overriding mods_dir from environment: {}", dir);
            self.paths.mods_dir = PathBuf::from(dir);
        }

        if let Some(dir) = non_empty_env("DECKHAND_FILES_DIR") {
            tracing::info!("Overriding files_dir from environment: {}", dir);
            self.paths.files_dir = PathBuf::from(dir);
        }

        if let Some(host) = non_empty_env("DECKHAND_SERVER_HOST") {
            tracing::info!("Overriding server host from environment: {}", host);
            self.server.host = host;
        }

        if let Some(port) = non_empty_env("DECKHAND_SERVER_PORT") {
            match port.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Overriding server port from environment: {}", port);
                    self.server.port = port;
                }
                Err(_) => {
                    tracing::warn!("Ignoring unparseable DECKHAND_SERVER_PORT: {}", port);
                }
            }
        }

        if let Some(binary) = non_empty_env("DECKHAND_RUNTIME_BINARY") {
            tracing::info!("Overriding runtime binary from environment: {}", binary);
            self.runtime.binary = binary;
        }

        if let Some(unit) = non_empty_env("DECKHAND_RUNTIME_UNIT") {
            tracing::info!("Overriding runtime unit from environment: {}", unit);
            self.runtime.unit = Some(unit);
        }

        if let Some(marker) = non_empty_env("DECKHAND_IMAGE_MARKER") {
            tracing::info!("Overriding image_marker from environment: {}", marker);
            self.runtime.image_marker = marker;
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.daemon.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.daemon.log_level.clone()));
        }

        if self.http.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddr(self.http.bind_addr.clone()));
        }

        if self.http.max_body_size == 0 {
            return Err(ConfigError::InvalidMaxBodySize(self.http.max_body_size));
        }

        if self.paths.mods_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyValue("mods_dir"));
        }
        if self.paths.files_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyValue("files_dir"));
        }

        if self.server.host.is_empty() {
            return Err(ConfigError::EmptyValue("server host"));
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidServerPort);
        }
        if self.server.status_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("status_timeout_secs"));
        }

        if self.runtime.binary.is_empty() {
            return Err(ConfigError::EmptyValue("runtime binary"));
        }
        if self.runtime.restart_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("restart_timeout_secs"));
        }
        if self.runtime.unit.is_none() && self.runtime.image_marker.is_empty() {
            return Err(ConfigError::MissingImageMarker);
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    ///
    /// The default path is `~/.config/deckhand/config.toml`.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Read an environment variable, treating unset and empty as absent.
fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.daemon.log_level, "info");
        assert_eq!(config.http.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.http.max_body_size, 100 * 1024 * 1024);
        assert_eq!(config.paths.mods_dir, PathBuf::from("/data/mods"));
        assert_eq!(config.paths.files_dir, PathBuf::from("/data"));
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 25565);
        assert_eq!(config.server.status_timeout_secs, 5);
        assert_eq!(config.runtime.binary, "docker");
        assert!(config.runtime.unit.is_none());
        assert_eq!(config.runtime.image_marker, "minecraft-server");
        assert_eq!(config.runtime.restart_timeout_secs, 30);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_from_toml_empty() {
        // Empty TOML should use all defaults
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[daemon]
log_level = "debug"

[server]
port = 25566
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.daemon.log_level, "debug");
        assert_eq!(config.server.port, 25566);
        // Other values should be defaults
        assert_eq!(config.http.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.paths.files_dir, PathBuf::from("/data"));
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[daemon]
log_level = "trace"

[http]
bind_addr = "127.0.0.1:9090"
max_body_size = 52428800

[paths]
mods_dir = "/srv/mc/mods"
files_dir = "/srv/mc"

[server]
host = "mc.example.net"
port = 25570
status_timeout_secs = 3

[runtime]
binary = "podman"
unit = "mc-server-1"
image_marker = "papermc"
restart_timeout_secs = 60
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.daemon.log_level, "trace");
        assert_eq!(config.http.bind_addr, "127.0.0.1:9090");
        assert_eq!(config.http.max_body_size, 52428800);
        assert_eq!(config.paths.mods_dir, PathBuf::from("/srv/mc/mods"));
        assert_eq!(config.paths.files_dir, PathBuf::from("/srv/mc"));
        assert_eq!(config.server.host, "mc.example.net");
        assert_eq!(config.server.port, 25570);
        assert_eq!(config.server.status_timeout_secs, 3);
        assert_eq!(config.runtime.binary, "podman");
        assert_eq!(config.runtime.unit.as_deref(), Some("mc-server-1"));
        assert_eq!(config.runtime.image_marker, "papermc");
        assert_eq!(config.runtime.restart_timeout_secs, 60);
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let toml = r#"
[daemon
log_level = "debug"
"#;
        let result = Config::from_toml(toml);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let toml = r#"
[server]
port = "not a number"
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_to_toml_contains_all_sections() {
        let toml = Config::default().to_toml().unwrap();

        assert!(toml.contains("[daemon]"));
        assert!(toml.contains("[http]"));
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[server]"));
        assert!(toml.contains("[runtime]"));
    }

    #[test]
    fn test_roundtrip() {
        let original = Config::default();
        let toml = original.to_toml().unwrap();
        let loaded = Config::from_toml(&toml).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut original = Config::default();
        original.daemon.log_level = "warn".to_string();
        original.paths.mods_dir = PathBuf::from("/opt/mods");
        original.server.port = 25599;
        original.runtime.unit = Some("fixed-unit".to_string());

        let toml = original.to_toml().unwrap();
        let loaded = Config::from_toml(&toml).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut original = Config::default();
        original.daemon.log_level = "debug".to_string();
        original.server.host = "game.local".to_string();

        original.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_save_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir
            .path()
            .join("nested")
            .join("dirs")
            .join("config.toml");

        Config::default().save(&config_path).unwrap();
        assert!(config_path.exists());
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        fs::write(&config_path, "invalid [ toml").unwrap();

        let result = Config::load(&config_path);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("deckhand"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    #[serial]
    fn test_env_override_log_level() {
        std::env::set_var("DECKHAND_LOG_LEVEL", "debug");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.daemon.log_level, "debug");

        std::env::remove_var("DECKHAND_LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        std::env::set_var("DECKHAND_LOG_LEVEL", "");
        std::env::set_var("DECKHAND_MODS_DIR", "");

        let mut config = Config::default();
        config.apply_env_overrides();

        // Empty strings are ignored
        assert_eq!(config.daemon.log_level, "info");
        assert_eq!(config.paths.mods_dir, PathBuf::from("/data/mods"));

        std::env::remove_var("DECKHAND_LOG_LEVEL");
        std::env::remove_var("DECKHAND_MODS_DIR");
    }

    #[test]
    #[serial]
    fn test_env_override_paths_and_server() {
        std::env::set_var("DECKHAND_MODS_DIR", "/alt/mods");
        std::env::set_var("DECKHAND_FILES_DIR", "/alt");
        std::env::set_var("DECKHAND_SERVER_HOST", "10.0.0.2");
        std::env::set_var("DECKHAND_SERVER_PORT", "25599");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.paths.mods_dir, PathBuf::from("/alt/mods"));
        assert_eq!(config.paths.files_dir, PathBuf::from("/alt"));
        assert_eq!(config.server.host, "10.0.0.2");
        assert_eq!(config.server.port, 25599);

        std::env::remove_var("DECKHAND_MODS_DIR");
        std::env::remove_var("DECKHAND_FILES_DIR");
        std::env::remove_var("DECKHAND_SERVER_HOST");
        std::env::remove_var("DECKHAND_SERVER_PORT");
    }

    #[test]
    #[serial]
    fn test_env_override_bad_port_ignored() {
        std::env::set_var("DECKHAND_SERVER_PORT", "not-a-port");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.server.port, 25565);

        std::env::remove_var("DECKHAND_SERVER_PORT");
    }

    #[test]
    #[serial]
    fn test_env_override_runtime() {
        std::env::set_var("DECKHAND_RUNTIME_BINARY", "podman");
        std::env::set_var("DECKHAND_RUNTIME_UNIT", "mc-1");
        std::env::set_var("DECKHAND_IMAGE_MARKER", "papermc");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.runtime.binary, "podman");
        assert_eq!(config.runtime.unit.as_deref(), Some("mc-1"));
        assert_eq!(config.runtime.image_marker, "papermc");

        std::env::remove_var("DECKHAND_RUNTIME_BINARY");
        std::env::remove_var("DECKHAND_RUNTIME_UNIT");
        std::env::remove_var("DECKHAND_IMAGE_MARKER");
    }

    #[test]
    fn test_validate_log_level_case_insensitive() {
        let mut config = Config::default();

        config.daemon.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        config.daemon.log_level = "Info".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_level_invalid() {
        let mut config = Config::default();
        config.daemon.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    fn test_validate_bind_addr_invalid() {
        let mut config = Config::default();
        config.http.bind_addr = "not-an-addr".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBindAddr("not-an-addr".to_string()))
        );
    }

    #[test]
    fn test_validate_max_body_size_zero() {
        let mut config = Config::default();
        config.http.max_body_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxBodySize(0)));
    }

    #[test]
    fn test_validate_empty_paths() {
        let mut config = Config::default();
        config.paths.mods_dir = PathBuf::new();
        assert_eq!(config.validate(), Err(ConfigError::EmptyValue("mods_dir")));

        let mut config = Config::default();
        config.paths.files_dir = PathBuf::new();
        assert_eq!(config.validate(), Err(ConfigError::EmptyValue("files_dir")));
    }

    #[test]
    fn test_validate_server_values() {
        let mut config = Config::default();
        config.server.host = String::new();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyValue("server host"))
        );

        let mut config = Config::default();
        config.server.port = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidServerPort));

        let mut config = Config::default();
        config.server.status_timeout_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidTimeout("status_timeout_secs"))
        );
    }

    #[test]
    fn test_validate_runtime_values() {
        let mut config = Config::default();
        config.runtime.binary = String::new();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyValue("runtime binary"))
        );

        let mut config = Config::default();
        config.runtime.restart_timeout_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidTimeout("restart_timeout_secs"))
        );
    }

    #[test]
    fn test_validate_image_marker_required_in_discovery_mode() {
        let mut config = Config::default();
        config.runtime.image_marker = String::new();
        assert_eq!(config.validate(), Err(ConfigError::MissingImageMarker));

        // A fixed unit makes the marker unnecessary.
        config.runtime.unit = Some("mc-1".to_string());
        assert!(config.validate().is_ok());
    }
}
