//! Application configuration
//!
//! Loaded from a TOML file, separate from the webhook configuration store.
//! A production variant (`config/app.prod.toml`) takes precedence over the
//! development file (`config/app.toml`) when present; `HOOKBRIDGE_CONFIG`
//! overrides the path outright. `${NAME}` placeholders in the file resolve
//! from the environment before parsing, and `HOOKBRIDGE_<SECTION>_<KEY>`
//! variables override any recognised key afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default development configuration path
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

/// Production variant, preferred when it exists
pub const PRODUCTION_CONFIG_PATH: &str = "config/app.prod.toml";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Sink endpoint and credentials
    pub sink: SinkConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Payload logging configuration
    #[serde(default)]
    pub webhook_logging: WebhookLoggingConfig,

    /// Webhook configuration store paths
    #[serde(default)]
    pub store: StoreConfig,

    /// Request processing limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Sink (monitoring API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink endpoint URL
    pub url: String,

    /// HTTP Basic username
    pub username: String,

    /// HTTP Basic password
    pub password: String,

    /// Per-attempt deadline in seconds
    #[serde(default = "default_sink_timeout")]
    pub timeout_seconds: u64,

    /// Maximum delivery attempts
    #[serde(default = "default_sink_attempts")]
    pub retry_attempts: u32,
}

fn default_sink_timeout() -> u64 {
    30
}

fn default_sink_attempts() -> u32 {
    3
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log verbosity when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
        }
    }
}

/// Payload logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookLoggingConfig {
    /// Turn payload logging on or off
    pub enabled: bool,

    /// Root of the per-service log directories
    pub base_directory: PathBuf,

    /// Rotation threshold in bytes
    pub max_bytes: u64,

    /// Rotated files retained per service
    pub backup_count: u32,

    /// Active file name
    pub log_file_name: String,
}

impl Default for WebhookLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_directory: PathBuf::from("logs/webhooks"),
            max_bytes: 10 * 1024 * 1024,
            backup_count: 5,
            log_file_name: "payload.log".to_string(),
        }
    }
}

/// Webhook configuration store paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// The webhook configuration file
    pub config_file: PathBuf,

    /// Directory for pre-write backups
    pub backup_directory: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("config/webhooks.conf"),
            backup_directory: PathBuf::from("config/backups"),
        }
    }
}

/// Request processing limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-request processing budget in seconds
    pub processing_timeout_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            processing_timeout_seconds: 30,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("configuration parsing failed: {0}")]
    Parsing(#[from] toml::de::Error),

    #[error("environment variable '{name}' referenced by configuration is not set")]
    UnsetVariable { name: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl AppConfig {
    /// Load configuration from the default location
    ///
    /// `HOOKBRIDGE_CONFIG` wins when set; otherwise the production file is
    /// preferred over the development file.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var("HOOKBRIDGE_CONFIG") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                let production = Path::new(PRODUCTION_CONFIG_PATH);
                if production.exists() {
                    production.to_path_buf()
                } else {
                    PathBuf::from(DEFAULT_CONFIG_PATH)
                }
            }
        };

        Self::from_path(&path)
    }

    /// Load configuration from an explicit path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let text = resolve_placeholders(&text)?;
        let mut config: AppConfig = toml::from_str(&text)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HOOKBRIDGE_<SECTION>_<KEY>` environment overrides
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        override_from_env("HOOKBRIDGE_SERVER_HOST", &mut self.server.host)?;
        override_from_env("HOOKBRIDGE_SERVER_PORT", &mut self.server.port)?;

        override_from_env("HOOKBRIDGE_SINK_URL", &mut self.sink.url)?;
        override_from_env("HOOKBRIDGE_SINK_USERNAME", &mut self.sink.username)?;
        override_from_env("HOOKBRIDGE_SINK_PASSWORD", &mut self.sink.password)?;
        override_from_env(
            "HOOKBRIDGE_SINK_TIMEOUT_SECONDS",
            &mut self.sink.timeout_seconds,
        )?;
        override_from_env(
            "HOOKBRIDGE_SINK_RETRY_ATTEMPTS",
            &mut self.sink.retry_attempts,
        )?;

        override_from_env("HOOKBRIDGE_LOGGING_LEVEL", &mut self.logging.level)?;

        override_from_env(
            "HOOKBRIDGE_WEBHOOK_LOGGING_ENABLED",
            &mut self.webhook_logging.enabled,
        )?;
        override_path_from_env(
            "HOOKBRIDGE_WEBHOOK_LOGGING_BASE_DIRECTORY",
            &mut self.webhook_logging.base_directory,
        );
        override_from_env(
            "HOOKBRIDGE_WEBHOOK_LOGGING_MAX_BYTES",
            &mut self.webhook_logging.max_bytes,
        )?;
        override_from_env(
            "HOOKBRIDGE_WEBHOOK_LOGGING_BACKUP_COUNT",
            &mut self.webhook_logging.backup_count,
        )?;
        override_from_env(
            "HOOKBRIDGE_WEBHOOK_LOGGING_LOG_FILE_NAME",
            &mut self.webhook_logging.log_file_name,
        )?;

        override_path_from_env("HOOKBRIDGE_STORE_CONFIG_FILE", &mut self.store.config_file);
        override_path_from_env(
            "HOOKBRIDGE_STORE_BACKUP_DIRECTORY",
            &mut self.store.backup_directory,
        );

        override_from_env(
            "HOOKBRIDGE_LIMITS_PROCESSING_TIMEOUT_SECONDS",
            &mut self.limits.processing_timeout_seconds,
        )?;

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sink.url.is_empty() {
            return Err(ConfigError::Invalid {
                message: "sink.url must not be empty".to_string(),
            });
        }
        if self.sink.username.is_empty() || self.sink.password.is_empty() {
            return Err(ConfigError::Invalid {
                message: "sink credentials must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn override_from_env<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
{
    if let Ok(value) = std::env::var(name) {
        *target = value.parse().map_err(|_| ConfigError::Invalid {
            message: format!("environment override {} has an invalid value", name),
        })?;
    }
    Ok(())
}

fn override_path_from_env(name: &str, target: &mut PathBuf) {
    if let Ok(value) = std::env::var(name) {
        *target = PathBuf::from(value);
    }
}

/// Substitute `${NAME}` placeholders from the environment
///
/// Names are `[A-Za-z0-9_]+`; anything else is left verbatim. A referenced
/// but unset variable is an error rather than an empty credential.
fn resolve_placeholders(text: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            output.push_str(&rest[start..]);
            return Ok(output);
        };

        let name = &after[..end];
        if !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            let value =
                std::env::var(name).map_err(|_| ConfigError::UnsetVariable {
                    name: name.to_string(),
                })?;
            output.push_str(&value);
        } else {
            output.push_str("${");
            output.push_str(name);
            output.push('}');
        }

        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
