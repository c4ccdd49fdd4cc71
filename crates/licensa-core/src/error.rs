//! Fault Types
//!
//! [`Fault`] is the failure type returned by request handlers. The request
//! pipeline's fault boundary classifies every `Fault` into a status code and
//! an [`ErrorEnvelope`](crate::ErrorEnvelope), so handlers only say *what*
//! went wrong.
//!
//! # Example
//!
//! ```
//! use licensa_core::{Fault, Result};
//!
//! fn approve(status: &str) -> Result<()> {
//!     if status != "Pending" {
//!         return Err(Fault::invalid_operation(format!(
//!             "Cannot approve a license in status {status}"
//!         )));
//!     }
//!     Ok(())
//! }
//!
//! assert!(approve("Approved").is_err());
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use thiserror::Error;

/// Input validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required value was absent.
    #[error("Required value '{field}' was not provided")]
    Missing {
        /// Name of the missing field or argument
        field: String,
    },

    /// A value was present but malformed.
    #[error("Invalid value for '{field}': {message}")]
    Invalid {
        /// Name of the offending field or argument
        field: String,
        /// Description of the validation failure
        message: String,
    },
}

/// Failure raised by a request handler.
///
/// # Variants
///
/// - `Validation` - Missing or malformed input (HTTP 400)
/// - `InvalidOperation` - Business precondition violated (HTTP 400)
/// - `Unauthorized` - Caller lacks permission (HTTP 401)
/// - `NotFound` - Lookup miss (HTTP 404)
/// - `Cancelled` - Processing stopped because the request was abandoned
/// - `Internal` - Anything else (HTTP 500, message never shown to clients)
#[derive(Debug, Error)]
pub enum Fault {
    /// Missing or malformed input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The requested operation is not valid in the current state.
    #[error("{0}")]
    InvalidOperation(String),

    /// Caller is not allowed to perform the operation.
    #[error("Unauthorized{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Unauthorized {
        /// Optional message providing more context
        message: Option<String>,
    },

    /// Requested resource does not exist (or belongs to another tenant).
    #[error("{resource} not found{}", id.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
    NotFound {
        /// The type of resource that was not found (e.g., "License")
        resource: String,
        /// Optional identifier of the resource
        id: Option<String>,
    },

    /// The request was cancelled by the hosting layer or the client.
    #[error("Request was cancelled")]
    Cancelled,

    /// Unclassified failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Fault {
    /// A required value was not provided.
    pub fn missing(field: impl Into<String>) -> Self {
        ValidationError::Missing {
            field: field.into(),
        }
        .into()
    }

    /// A value was provided but is malformed.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field: field.into(),
            message: message.into(),
        }
        .into()
    }

    /// A business precondition was violated.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// The caller lacks permission.
    pub fn unauthorized(message: Option<String>) -> Self {
        Self::Unauthorized { message }
    }

    /// A lookup found nothing.
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// An unclassified failure with a message meant for operators only.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }

    /// Short, stable name of the variant, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Fault::Validation(ValidationError::Missing { .. }) => "missing_value",
            Fault::Validation(ValidationError::Invalid { .. }) => "invalid_argument",
            Fault::InvalidOperation(_) => "invalid_operation",
            Fault::Unauthorized { .. } => "unauthorized",
            Fault::NotFound { .. } => "not_found",
            Fault::Cancelled => "cancelled",
            Fault::Internal(_) => "internal",
        }
    }

    /// Returns true if this fault only signals cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Fault::Cancelled)
    }
}

/// Type alias for Results using [`Fault`].
pub type Result<T> = std::result::Result<T, Fault>;

/// Response extension carrying a [`Fault`] raised by an axum handler.
///
/// Axum handlers must produce a response, so a handler returning
/// `Err(Fault)` turns it into a placeholder 500 response with this extension
/// attached. The pipeline's fault boundary removes the extension and
/// classifies the fault it carries. Without the pipeline installed, the client
/// simply receives an empty 500.
#[derive(Debug, Clone)]
pub struct RaisedFault(pub Arc<Fault>);

impl RaisedFault {
    /// Takes the fault out of a response, if one was raised.
    pub fn take(response: &mut Response) -> Option<Fault> {
        response
            .extensions_mut()
            .remove::<RaisedFault>()
            .map(RaisedFault::into_fault)
    }

    /// Recovers the owned fault. A fault still shared with a clone of the
    /// response is duplicated; internal faults keep their rendered chain.
    #[must_use]
    pub fn into_fault(self) -> Fault {
        Arc::try_unwrap(self.0).unwrap_or_else(|shared| match &*shared {
            Fault::Validation(err) => Fault::Validation(err.clone()),
            Fault::InvalidOperation(message) => Fault::InvalidOperation(message.clone()),
            Fault::Unauthorized { message } => Fault::Unauthorized {
                message: message.clone(),
            },
            Fault::NotFound { resource, id } => Fault::NotFound {
                resource: resource.clone(),
                id: id.clone(),
            },
            Fault::Cancelled => Fault::Cancelled,
            Fault::Internal(err) => Fault::Internal(anyhow::anyhow!("{err:#}")),
        })
    }
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response
            .extensions_mut()
            .insert(RaisedFault(Arc::new(self)));
        response
    }
}
