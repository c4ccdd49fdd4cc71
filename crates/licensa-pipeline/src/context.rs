//! Per-request context.
//!
//! A [`RequestContext`] is created when a request enters the pipeline and
//! dropped when its response leaves. Stages receive it by `&mut`; handlers
//! behind [`PipelineService`](crate::PipelineService) see a read-only copy in
//! the request extensions.

use http::{Method, Request};
use licensa_core::{Fault, RequestId, TenantId};
use thiserror::Error;
use tracing::field::Empty;
use tracing::Span;

/// Header the hosting layer uses to hand over a correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Placeholder logged in place of a tenant id that is not (yet) known.
pub const UNKNOWN_TENANT: &str = "unknown";

/// Errors raised by context mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("tenant {existing} is already set for this request")]
    TenantAlreadySet { existing: TenantId },
}

/// Request-scoped state shared by the pipeline stages.
///
/// Holds the correlation id, the resolved tenant (if any) and the request
/// span. Every log record emitted while the span is entered carries
/// `request_id` and, once resolution succeeds, `tenant_id`.
///
/// # Example
///
/// ```rust,ignore
/// use axum::Extension;
/// use licensa_pipeline::RequestContext;
///
/// async fn handler(Extension(cx): Extension<RequestContext>) -> String {
///     format!("{} / {}", cx.request_id(), cx.tenant_or_unknown())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    tenant: Option<TenantId>,
    method: Method,
    path: String,
    span: Span,
}

impl RequestContext {
    /// Create a context with an explicit correlation id.
    #[must_use]
    pub fn new(request_id: RequestId, method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            tenant_id = Empty,
            method = %method,
            path = %path,
        );

        Self {
            request_id,
            tenant: None,
            method,
            path,
            span,
        }
    }

    /// Create a context for an inbound request, adopting the hosting layer's
    /// `x-request-id` when it is usable and generating one otherwise.
    #[must_use]
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(RequestId::from_external)
            .unwrap_or_default();

        Self::new(
            request_id,
            request.method().clone(),
            request.uri().path().to_string(),
        )
    }

    /// Correlation id of this request.
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Resolved tenant, if tenant resolution ran and succeeded.
    #[must_use]
    pub fn tenant(&self) -> Option<&TenantId> {
        self.tenant.as_ref()
    }

    /// Resolved tenant id or `"unknown"`, for log fields.
    #[must_use]
    pub fn tenant_or_unknown(&self) -> &str {
        self.tenant.as_ref().map_or(UNKNOWN_TENANT, TenantId::as_str)
    }

    /// Resolved tenant for handlers that are tenant-scoped.
    ///
    /// # Errors
    ///
    /// Returns an internal fault if called on a request that bypassed
    /// tenant resolution.
    pub fn require_tenant(&self) -> Result<&TenantId, Fault> {
        self.tenant
            .as_ref()
            .ok_or_else(|| Fault::internal("tenant-scoped handler reached without a resolved tenant"))
    }

    /// HTTP method of the request.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path of the request, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The request span. Stages instrument their work with it.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Record the resolved tenant. Allowed exactly once per request.
    pub(crate) fn set_tenant(&mut self, tenant: TenantId) -> Result<(), ContextError> {
        if let Some(existing) = &self.tenant {
            return Err(ContextError::TenantAlreadySet {
                existing: existing.clone(),
            });
        }

        self.span.record("tenant_id", tenant.as_str());
        self.tenant = Some(tenant);
        Ok(())
    }
}
