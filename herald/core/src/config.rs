//! Channel Configuration
//!
//! Endpoint, reconnect delays and toast timing, loaded with the following
//! priority (highest first):
//! 1. CLI arguments (applied by the caller)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! The file lives at `$XDG_CONFIG_HOME/herald/herald.toml`
//! (typically `~/.config/herald/herald.toml`).
//!
//! # Example Configuration
//!
//! ```toml
//! [channel]
//! endpoint = "wss://fairplay.example.com/notifications"
//! base_delay_ms = 250
//! max_delay_ms = 5000
//! connect_timeout_ms = 5000
//!
//! [toast]
//! autohide_ms = 5000
//! ```
//!
//! # Environment Variables
//!
//! - `HERALD_ENDPOINT`: WebSocket endpoint
//! - `HERALD_BASE_DELAY_MS`: first reconnect delay
//! - `HERALD_MAX_DELAY_MS`: reconnect delay ceiling
//! - `HERALD_CONNECT_TIMEOUT_MS`: connection attempt timeout
//! - `HERALD_AUTOHIDE_MS`: how long transient toasts stay visible

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path the notification endpoint is served on
pub const NOTIFICATIONS_PATH: &str = "/notifications";

/// Default endpoint: a local development server
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:5000/notifications";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Where the effective configuration came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Notification channel settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// WebSocket endpoint (`ws://` or `wss://`)
    pub endpoint: String,

    /// First reconnect delay in milliseconds
    pub base_delay_ms: u64,

    /// Reconnect delay ceiling in milliseconds
    pub max_delay_ms: u64,

    /// Connection attempt timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Visible time of transient toasts in milliseconds
    pub autohide_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            base_delay_ms: 250,
            max_delay_ms: 5000,
            connect_timeout_ms: 5000,
            autohide_ms: 5000,
        }
    }
}

impl ChannelConfig {
    /// Configuration for an endpoint, defaults otherwise
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// First reconnect delay
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Reconnect delay ceiling
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Connection attempt timeout
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Visible time of transient toasts
    #[must_use]
    pub fn autohide(&self) -> Duration {
        Duration::from_millis(self.autohide_ms)
    }

    /// Check the values make sense together
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` naming the offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(format!(
                "endpoint must be a ws:// or wss:// URL, got {:?}",
                self.endpoint
            )));
        }
        if self.base_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "base_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::ValidationError(format!(
                "max_delay_ms ({}) must not be below base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Derive the notification endpoint from a site URL
///
/// `http://` becomes `ws://`, `https://` becomes `wss://`, and the
/// notifications path replaces whatever path the URL had.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` for unsupported schemes.
pub fn endpoint_from_base(base: &str) -> Result<String, ConfigError> {
    let (scheme, rest) = base.split_once("://").ok_or_else(|| {
        ConfigError::ValidationError(format!("{base:?} is not an absolute URL"))
    })?;

    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ConfigError::ValidationError(format!(
                "unsupported scheme {other:?} in {base:?}"
            )))
        }
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{base:?} has no host"
        )));
    }

    Ok(format!("{ws_scheme}://{authority}{NOTIFICATIONS_PATH}"))
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Channel section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelToml {
    /// WebSocket endpoint
    pub endpoint: Option<String>,
    /// Site URL to derive the endpoint from (ignored when `endpoint` is set)
    pub base_url: Option<String>,
    /// First reconnect delay in milliseconds
    pub base_delay_ms: Option<u64>,
    /// Reconnect delay ceiling in milliseconds
    pub max_delay_ms: Option<u64>,
    /// Connection attempt timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
}

/// Toast section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastToml {
    /// Visible time of transient toasts in milliseconds
    pub autohide_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldToml {
    /// Channel configuration section
    pub channel: ChannelToml,
    /// Toast configuration section
    pub toast: ToastToml,
}

/// Effective configuration plus where it came from
#[derive(Clone, Debug, Default)]
pub struct LoadedConfig {
    /// Channel settings
    pub channel: ChannelConfig,
    /// Path of the file that was loaded, if any
    pub config_file_path: Option<PathBuf>,
    /// Highest-priority source that contributed a value
    pub source: ConfigSource,
}

/// Get the default configuration file path
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("herald").join("herald.toml"))
}

/// Load configuration from the default path and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed,
/// or if the resulting configuration is invalid.
pub fn load_config() -> Result<LoadedConfig, ConfigError> {
    load_config_from_path(default_config_path().as_deref())
}

/// Load configuration from a specific path and the environment
///
/// A missing file is not an error; defaults are used.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// resulting configuration is invalid.
pub fn load_config_from_path(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let loaded = load_config_layers(path, |key| std::env::var(key).ok())?;
    loaded.channel.validate()?;
    Ok(loaded)
}

/// Merge defaults, the file at `path` and the variables `env` yields
///
/// Nothing is validated: callers that layer CLI values on top validate the
/// final result once with [`ChannelConfig::validate`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if it names an
/// unsupported `base_url`.
pub fn load_config_layers(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<LoadedConfig, ConfigError> {
    let mut loaded = LoadedConfig::default();

    if let Some(config_path) = path {
        if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.to_path_buf(),
                    source: e,
                })?;
            let toml: HeraldToml = toml::from_str(&content)?;
            apply_toml_config(&mut loaded.channel, &toml)?;
            loaded.config_file_path = Some(config_path.to_path_buf());
            loaded.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    if apply_env_config(&mut loaded.channel, env) {
        loaded.source = ConfigSource::Env;
    }

    Ok(loaded)
}

/// Apply TOML values over `config`
fn apply_toml_config(config: &mut ChannelConfig, toml: &HeraldToml) -> Result<(), ConfigError> {
    if let Some(endpoint) = &toml.channel.endpoint {
        config.endpoint.clone_from(endpoint);
    } else if let Some(base) = &toml.channel.base_url {
        config.endpoint = endpoint_from_base(base)?;
    }
    if let Some(delay) = toml.channel.base_delay_ms {
        config.base_delay_ms = delay;
    }
    if let Some(delay) = toml.channel.max_delay_ms {
        config.max_delay_ms = delay;
    }
    if let Some(timeout) = toml.channel.connect_timeout_ms {
        config.connect_timeout_ms = timeout;
    }
    if let Some(autohide) = toml.toast.autohide_ms {
        config.autohide_ms = autohide;
    }
    Ok(())
}

/// Apply environment overrides; returns whether any applied
///
/// Unparseable numbers are ignored with a warning.
fn apply_env_config(config: &mut ChannelConfig, var: impl Fn(&str) -> Option<String>) -> bool {
    let mut applied = false;

    if let Some(endpoint) = var("HERALD_ENDPOINT") {
        config.endpoint = endpoint;
        applied = true;
    }

    let numeric: [(&str, &mut u64); 4] = [
        ("HERALD_BASE_DELAY_MS", &mut config.base_delay_ms),
        ("HERALD_MAX_DELAY_MS", &mut config.max_delay_ms),
        ("HERALD_CONNECT_TIMEOUT_MS", &mut config.connect_timeout_ms),
        ("HERALD_AUTOHIDE_MS", &mut config.autohide_ms),
    ];
    for (key, slot) in numeric {
        if let Some(raw) = var(key) {
            match raw.parse::<u64>() {
                Ok(value) => {
                    *slot = value;
                    applied = true;
                }
                Err(e) => tracing::warn!(key, value = %raw, error = %e, "Ignoring invalid value"),
            }
        }
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.base_delay(), Duration::from_millis(250));
        assert_eq!(config.max_delay(), Duration::from_millis(5000));
        assert_eq!(config.autohide(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let bad_scheme = ChannelConfig::for_endpoint("http://localhost/notifications");
        assert!(matches!(
            bad_scheme.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let zero_base = ChannelConfig {
            base_delay_ms: 0,
            ..ChannelConfig::default()
        };
        assert!(zero_base.validate().is_err());

        let inverted = ChannelConfig {
            base_delay_ms: 1000,
            max_delay_ms: 500,
            ..ChannelConfig::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_endpoint_from_base() {
        assert_eq!(
            endpoint_from_base("https://fairplay.example.com/admin/users?page=2").unwrap(),
            "wss://fairplay.example.com/notifications"
        );
        assert_eq!(
            endpoint_from_base("http://127.0.0.1:5000").unwrap(),
            "ws://127.0.0.1:5000/notifications"
        );
        assert!(endpoint_from_base("ftp://example.com").is_err());
        assert!(endpoint_from_base("example.com").is_err());
        assert!(endpoint_from_base("https:///path").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[channel]
base_url = "https://fairplay.example.com"
base_delay_ms = 100
max_delay_ms = 1600

[toast]
autohide_ms = 8000
"#
        )
        .unwrap();

        let mut config = ChannelConfig::default();
        let toml: HeraldToml =
            toml::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        apply_toml_config(&mut config, &toml).unwrap();

        assert_eq!(config.endpoint, "wss://fairplay.example.com/notifications");
        assert_eq!(config.base_delay_ms, 100);
        assert_eq!(config.max_delay_ms, 1600);
        assert_eq!(config.connect_timeout_ms, 5000);
        assert_eq!(config.autohide_ms, 8000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let loaded = load_config_from_path(Some(&path)).unwrap();
        assert!(loaded.config_file_path.is_none());
        assert_ne!(loaded.source, ConfigSource::File);
    }

    #[test]
    fn test_no_env_leaves_config_untouched() {
        let mut config = ChannelConfig::default();
        assert!(!apply_env_config(&mut config, |_| None));
        assert_eq!(config, ChannelConfig::default());
    }

    #[test]
    fn test_parse_error_reported() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[channel\nendpoint = ").unwrap();

        let result = load_config_from_path(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HERALD_ENDPOINT", "wss://push.example.com/notifications"),
            ("HERALD_MAX_DELAY_MS", "30000"),
            ("HERALD_AUTOHIDE_MS", "soon"),
        ]
        .into_iter()
        .collect();

        let mut config = ChannelConfig::default();
        let applied = apply_env_config(&mut config, |key| env.get(key).map(|v| (*v).to_string()));

        assert!(applied);
        assert_eq!(config.endpoint, "wss://push.example.com/notifications");
        assert_eq!(config.max_delay_ms, 30_000);
        // Unparseable values leave the default in place
        assert_eq!(config.autohide_ms, 5000);
    }

    #[test]
    fn test_layers_are_not_validated() {
        let env: HashMap<&str, &str> = [
            ("HERALD_ENDPOINT", "http://example.com/notifications"),
            ("HERALD_BASE_DELAY_MS", "10000"),
        ]
        .into_iter()
        .collect();

        let loaded =
            load_config_layers(None, |key| env.get(key).map(|v| (*v).to_string())).unwrap();
        assert_eq!(loaded.source, ConfigSource::Env);
        assert_eq!(loaded.channel.endpoint, "http://example.com/notifications");
        assert_eq!(loaded.channel.base_delay_ms, 10_000);

        // The merged layers alone are invalid; a later layer may still fix them
        assert!(loaded.channel.validate().is_err());
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::File.to_string(), "config file");
        assert_eq!(ConfigSource::default(), ConfigSource::Default);
    }
}
