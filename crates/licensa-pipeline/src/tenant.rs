//! Tenant resolution stage.
//!
//! Reads the tenant header, validates it and records the tenant in the
//! [`RequestContext`]. Requests outside the exempt path set that carry no
//! usable tenant id are rejected with 400 `MISSING_TENANT` before any
//! downstream code runs.

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use http::{HeaderMap, HeaderName, Request, StatusCode};
use licensa_core::{ErrorCode, ErrorEnvelope, Fault, ParseTenantIdError, TenantId};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::context::RequestContext;
use crate::stage::{Next, Stage};

/// Why a request was refused a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("tenant header is missing")]
    MissingHeader,

    #[error("tenant header is malformed: {0}")]
    InvalidFormat(String),
}

/// Outcome of resolving the tenant of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantResolution {
    /// Path is exempt; no tenant is required or recorded.
    Exempt,
    /// Header carried a well-formed tenant id.
    Resolved(TenantId),
    /// Request must not proceed.
    Rejected(RejectReason),
}

/// Stage that establishes the tenant of each request, failing closed.
#[derive(Debug, Clone)]
pub struct TenantResolutionStage {
    config: Arc<PipelineConfig>,
    header: HeaderName,
}

impl TenantResolutionStage {
    pub const NAME: &'static str = "tenant_resolution";

    /// Create the stage.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHeaderName`] if the configured header
    /// name is not a legal HTTP header name.
    pub fn new(config: Arc<PipelineConfig>) -> Result<Self, ConfigError> {
        let header = config.tenant_header_name()?;
        Ok(Self { config, header })
    }

    /// Decide the tenant of a request from its headers and path.
    ///
    /// Only the first value of the header is considered, and it is used
    /// verbatim: surrounding whitespace makes it malformed.
    #[must_use]
    pub fn resolve(&self, headers: &HeaderMap, path: &str) -> TenantResolution {
        if self.config.is_exempt(path) {
            return TenantResolution::Exempt;
        }

        let Some(value) = headers.get(&self.header) else {
            return TenantResolution::Rejected(RejectReason::MissingHeader);
        };

        let Ok(raw) = value.to_str() else {
            return TenantResolution::Rejected(RejectReason::InvalidFormat(
                "value is not visible ASCII".to_string(),
            ));
        };

        match TenantId::parse(raw) {
            Ok(tenant) => TenantResolution::Resolved(tenant),
            Err(ParseTenantIdError::Empty) => TenantResolution::Rejected(RejectReason::MissingHeader),
            Err(err) => TenantResolution::Rejected(RejectReason::InvalidFormat(err.to_string())),
        }
    }

    fn reject(&self, cx: &RequestContext) -> Response {
        let message = format!("Missing or invalid {} header", self.config.tenant_header);
        ErrorEnvelope::new(ErrorCode::MissingTenant, message, cx.request_id().as_str())
            .into_response_with(StatusCode::BAD_REQUEST)
    }
}

#[async_trait]
impl Stage for TenantResolutionStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        request: Request<Body>,
        cx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, Fault> {
        match self.resolve(request.headers(), request.uri().path()) {
            TenantResolution::Exempt => {
                tracing::trace!(path = %cx.path(), "tenant resolution skipped for exempt path");
                next.run(request, cx).await
            }
            TenantResolution::Resolved(tenant) => {
                cx.set_tenant(tenant)
                    .map_err(|err| Fault::Internal(anyhow::Error::new(err)))?;
                tracing::debug!(
                    request_id = %cx.request_id(),
                    tenant_id = %cx.tenant_or_unknown(),
                    "tenant resolved"
                );
                next.run(request, cx).await
            }
            TenantResolution::Rejected(reason) => {
                tracing::warn!(
                    request_id = %cx.request_id(),
                    path = %cx.path(),
                    header = %self.config.tenant_header,
                    reason = %reason,
                    "tenant resolution rejected request"
                );
                Ok(self.reject(cx))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn stage() -> TenantResolutionStage {
        TenantResolutionStage::new(Arc::new(PipelineConfig::default())).unwrap()
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_exempt_path_needs_no_header() {
        assert_eq!(
            stage().resolve(&HeaderMap::new(), "/healthz"),
            TenantResolution::Exempt
        );
    }

    #[test]
    fn test_exempt_path_ignores_header() {
        assert_eq!(
            stage().resolve(&headers("TEN-001"), "/health/live"),
            TenantResolution::Exempt
        );
    }

    #[test]
    fn test_resolves_valid_header() {
        assert_eq!(
            stage().resolve(&headers("TEN-001"), "/api/documents/5"),
            TenantResolution::Resolved(TenantId::parse("TEN-001").unwrap())
        );
    }

    #[test]
    fn test_header_name_is_case_insensitive() {
        let stage = TenantResolutionStage::new(Arc::new(
            PipelineConfig::builder().tenant_header("X-TENANT-ID").build(),
        ))
        .unwrap();
        assert!(matches!(
            stage.resolve(&headers("acme"), "/api/licenses"),
            TenantResolution::Resolved(_)
        ));
    }

    #[test]
    fn test_missing_header_rejected() {
        assert_eq!(
            stage().resolve(&HeaderMap::new(), "/api/licenses"),
            TenantResolution::Rejected(RejectReason::MissingHeader)
        );
    }

    #[test]
    fn test_empty_header_rejected_as_missing() {
        assert_eq!(
            stage().resolve(&headers(""), "/api/licenses"),
            TenantResolution::Rejected(RejectReason::MissingHeader)
        );
    }

    #[test]
    fn test_malformed_header_rejected() {
        let too_long = "a".repeat(51);
        for value in ["TEN 001", "ten.001", " TEN-001", too_long.as_str()] {
            assert!(
                matches!(
                    stage().resolve(&headers(value), "/api/licenses"),
                    TenantResolution::Rejected(RejectReason::InvalidFormat(_))
                ),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_non_ascii_header_rejected() {
        let mut map = HeaderMap::new();
        map.insert(
            "x-tenant-id",
            HeaderValue::from_bytes(b"TEN-\xC3\xA9").unwrap(),
        );
        assert!(matches!(
            stage().resolve(&map, "/api/licenses"),
            TenantResolution::Rejected(RejectReason::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_only_first_value_is_used() {
        let mut map = HeaderMap::new();
        map.append("x-tenant-id", HeaderValue::from_static("bad value"));
        map.append("x-tenant-id", HeaderValue::from_static("TEN-001"));
        assert!(matches!(
            stage().resolve(&map, "/api/licenses"),
            TenantResolution::Rejected(_)
        ));
    }

    #[test]
    fn test_invalid_header_name_fails_construction() {
        let config = PipelineConfig::builder().tenant_header("bad header").build();
        assert!(TenantResolutionStage::new(Arc::new(config)).is_err());
    }
}
