//! Pipeline configuration.
//!
//! Loaded once at startup and shared read-only by every request.

use http::HeaderName;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default tenant header.
pub const DEFAULT_TENANT_HEADER: &str = "X-Tenant-ID";

/// Default ceiling for request body capture, in bytes. Bodies at or above
/// this size are never buffered for logging.
pub const DEFAULT_BODY_CAPTURE_LIMIT: usize = 2048;

/// Hard upper bound accepted for `body_capture_limit_bytes`.
pub const MAX_BODY_CAPTURE_LIMIT: usize = 64 * 1024;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid tenant header name: {0:?}")]
    InvalidHeaderName(String),

    #[error("exempt path prefix must start with '/': {0:?}")]
    InvalidPathPrefix(String),

    #[error("body capture limit {limit} exceeds maximum of {MAX_BODY_CAPTURE_LIMIT} bytes")]
    CaptureLimitTooLarge { limit: usize },
}

/// Configuration for the request pipeline.
///
/// # Example
///
/// ```rust
/// use licensa_pipeline::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .tenant_header("X-Organization-ID")
///     .exempt_path_prefix("/metrics")
///     .build();
///
/// assert!(config.is_exempt("/healthz"));
/// assert!(config.is_exempt("/metrics"));
/// assert!(!config.is_exempt("/api/licenses"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Header carrying the tenant id. Matched case-insensitively.
    pub tenant_header: String,

    /// Path prefixes that skip tenant resolution, matched segment-wise.
    pub exempt_path_prefixes: Vec<String>,

    /// Bodies smaller than this are captured for debug logging.
    pub body_capture_limit_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tenant_header: DEFAULT_TENANT_HEADER.to_string(),
            exempt_path_prefixes: vec![
                "/healthz".to_string(),
                "/health".to_string(),
                "/api/auth".to_string(),
            ],
            body_capture_limit_bytes: DEFAULT_BODY_CAPTURE_LIMIT,
        }
    }
}

impl PipelineConfig {
    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the configuration for values that cannot work at runtime.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tenant_header_name()?;

        if let Some(prefix) = self
            .exempt_path_prefixes
            .iter()
            .find(|prefix| !prefix.starts_with('/'))
        {
            return Err(ConfigError::InvalidPathPrefix(prefix.clone()));
        }

        if self.body_capture_limit_bytes > MAX_BODY_CAPTURE_LIMIT {
            return Err(ConfigError::CaptureLimitTooLarge {
                limit: self.body_capture_limit_bytes,
            });
        }
        Ok(())
    }

    /// The tenant header as an HTTP header name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHeaderName`] if the configured name is
    /// not a legal header name.
    pub fn tenant_header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::try_from(self.tenant_header.as_str())
            .map_err(|_| ConfigError::InvalidHeaderName(self.tenant_header.clone()))
    }

    /// Returns true if `path` falls under one of the exempt prefixes.
    ///
    /// Matching is by whole path segments and ignores ASCII case, so
    /// `/health` covers `/health` and `/Health/live` but not `/healthcheck`.
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_path_prefixes
            .iter()
            .any(|prefix| starts_with_segments(path, prefix))
    }
}

fn starts_with_segments(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }

    let head_matches = path
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix));

    head_matches && matches!(path.as_bytes().get(prefix.len()), None | Some(b'/'))
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the tenant header name.
    #[must_use]
    pub fn tenant_header(mut self, name: impl Into<String>) -> Self {
        self.config.tenant_header = name.into();
        self
    }

    /// Add an exempt path prefix to the defaults.
    #[must_use]
    pub fn exempt_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.exempt_path_prefixes.push(prefix.into());
        self
    }

    /// Replace the exempt path prefixes entirely.
    #[must_use]
    pub fn exempt_path_prefixes<I, P>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.config.exempt_path_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the body capture ceiling.
    #[must_use]
    pub fn body_capture_limit_bytes(mut self, limit: usize) -> Self {
        self.config.body_capture_limit_bytes = limit;
        self
    }

    /// Finish building. Validation happens when the pipeline is built.
    #[must_use]
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
