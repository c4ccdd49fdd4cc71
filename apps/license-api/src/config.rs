//! Service configuration loading and types.
//!
//! Configuration comes from a YAML file (optional) with environment
//! overrides applied on top, and is validated before the server starts.

use licensa_pipeline::PipelineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "LICENSA_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "./config/license-api.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Request timeout must be at least one second")]
    InvalidTimeout,

    #[error("Invalid pipeline configuration: {0}")]
    Pipeline(#[from] licensa_pipeline::ConfigError),
}

/// Root service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> u64 {
    30
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(()),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load, override from the environment and validate.
    ///
    /// A missing configuration file is not an error; the defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
                path: path.as_ref().to_path_buf(),
                source,
            })?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Get the configuration file path from environment or default.
    pub fn config_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("LICENSA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("LICENSA_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "LICENSA_PORT",
                value: port,
            })?;
        }
        if let Some(format) = lookup("LICENSA_LOG_FORMAT") {
            self.logging.format = format.parse().map_err(|()| ConfigError::InvalidEnv {
                name: "LICENSA_LOG_FORMAT",
                value: format,
            })?;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        self.pipeline.validate()?;
        Ok(())
    }

    /// Address to bind, as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
server:
  port: 9090
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.pipeline.tenant_header, "X-Tenant-ID");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server:
  host: 127.0.0.1
  port: 8081
  request_timeout_secs: 5

pipeline:
  tenant_header: X-Org-ID
  exempt_path_prefixes:
    - /healthz
    - /metrics
  body_capture_limit_bytes: 1024

logging:
  level: debug
  format: pretty
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8081");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.pipeline.tenant_header, "X-Org-ID");
        assert!(config.pipeline.is_exempt("/metrics"));
        assert!(!config.pipeline.is_exempt("/health"));
        assert_eq!(config.pipeline.body_capture_limit_bytes, 1024);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("LICENSA_HOST", "127.0.0.1"),
                ("LICENSA_PORT", "3000"),
                ("LICENSA_LOG_FORMAT", "Pretty"),
                ("RUST_LOG", "warn"),
            ]))
            .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(env(&[("LICENSA_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "LICENSA_PORT", .. }));
    }

    #[test]
    fn test_invalid_log_format_override() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_overrides(env(&[("LICENSA_LOG_FORMAT", "xml")]))
            .is_err());
    }

    #[test]
    fn test_validate_rejects_bad_pipeline() {
        let yaml = r#"
pipeline:
  tenant_header: "X Tenant"
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Pipeline(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.server.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout)));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = AppConfig::from_file("/nonexistent/license-api.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/license-api.yaml"));
    }
}
