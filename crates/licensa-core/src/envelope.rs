//! Wire-level response bodies.
//!
//! Every error response produced by the request pipeline has the shape:
//!
//! ```json
//! { "error": { "message": "...", "code": "MISSING_TENANT", "traceId": "..." } }
//! ```

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// Machine-readable error code of an [`ErrorEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Tenant header missing or malformed.
    MissingTenant,
    /// Missing or malformed input.
    ValidationError,
    /// Business precondition violated.
    InvalidOperation,
    /// Caller lacks permission.
    Unauthorized,
    /// Resource absent.
    NotFound,
    /// Unclassified failure.
    InternalError,
}

impl ErrorCode {
    /// Returns the code as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingTenant => "MISSING_TENANT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidOperation => "INVALID_OPERATION",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inner object of an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Human-readable message, safe to show to the caller
    pub message: String,
    /// Stable machine-readable code
    pub code: ErrorCode,
    /// Correlation id of the failed request
    pub trace_id: String,
}

/// Uniform error payload for every pipeline-generated non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    /// Create a new error envelope.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                message: message.into(),
                code,
                trace_id: trace_id.into(),
            },
        }
    }

    /// Serialize to the JSON wire form.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"error":{"message":"Failed to serialize error","code":"INTERNAL_ERROR","traceId":""}}"#
                .to_string()
        })
    }

    /// Build an HTTP response with the given status and this envelope as a
    /// JSON body.
    #[must_use]
    pub fn into_response_with(self, status: StatusCode) -> Response {
        let mut response = (status, self.to_json()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// Wrapper for successful handler payloads. Failures never use it: they
/// are rendered as an [`ErrorEnvelope`] by the request pipeline.
///
/// ```
/// use licensa_core::ApiResponse;
///
/// let ok = ApiResponse::ok(42);
/// assert!(ok.success);
/// assert_eq!(ok.data, 42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Always `true`
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a successful payload.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
