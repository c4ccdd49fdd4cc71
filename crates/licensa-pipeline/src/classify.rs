//! Fault classification.
//!
//! Maps a [`Fault`] to the status code, error code and client-facing message
//! of its error response. Rules are checked top to bottom and the first
//! match wins; a fault no rule claims is unclassified (500).

use http::StatusCode;
use licensa_core::{ErrorCode, Fault, ValidationError};
use std::borrow::Cow;
use std::io;

/// Message returned for every unclassified failure.
pub const GENERIC_INTERNAL_MESSAGE: &str =
    "An unexpected error occurred. Please contact support if the problem persists.";

const MISSING_VALUE_MESSAGE: &str = "Required value was not provided";
const UNAUTHORIZED_MESSAGE: &str = "You are not authorized to perform this action";
const NOT_FOUND_MESSAGE: &str = "The requested resource was not found";

/// Outcome of classifying a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Name of the matching rule, for logs
    pub category: &'static str,
    /// HTTP status of the error response
    pub status: StatusCode,
    /// Machine-readable code of the error response
    pub code: ErrorCode,
    /// Message safe to return to the caller
    pub message: Cow<'static, str>,
}

#[derive(Clone, Copy)]
enum ClientMessage {
    Fixed(&'static str),
    FromFault,
}

struct Rule {
    category: &'static str,
    matches: fn(&Fault) -> bool,
    status: StatusCode,
    code: ErrorCode,
    message: ClientMessage,
}

impl Rule {
    fn apply(&self, fault: &Fault) -> Classification {
        let message = match self.message {
            ClientMessage::Fixed(text) => Cow::Borrowed(text),
            ClientMessage::FromFault => Cow::Owned(fault.to_string()),
        };
        Classification {
            category: self.category,
            status: self.status,
            code: self.code,
            message,
        }
    }
}

const RULES: &[Rule] = &[
    Rule {
        category: "missing_value",
        matches: is_missing_value,
        status: StatusCode::BAD_REQUEST,
        code: ErrorCode::ValidationError,
        message: ClientMessage::Fixed(MISSING_VALUE_MESSAGE),
    },
    Rule {
        category: "malformed_input",
        matches: is_malformed_input,
        status: StatusCode::BAD_REQUEST,
        code: ErrorCode::ValidationError,
        message: ClientMessage::FromFault,
    },
    Rule {
        category: "invalid_operation",
        matches: is_invalid_operation,
        status: StatusCode::BAD_REQUEST,
        code: ErrorCode::InvalidOperation,
        message: ClientMessage::FromFault,
    },
    Rule {
        category: "access_denied",
        matches: is_access_denied,
        status: StatusCode::UNAUTHORIZED,
        code: ErrorCode::Unauthorized,
        message: ClientMessage::Fixed(UNAUTHORIZED_MESSAGE),
    },
    Rule {
        category: "resource_absent",
        matches: is_resource_absent,
        status: StatusCode::NOT_FOUND,
        code: ErrorCode::NotFound,
        message: ClientMessage::Fixed(NOT_FOUND_MESSAGE),
    },
];

const UNCLASSIFIED: Rule = Rule {
    category: "unclassified",
    matches: |_| true,
    status: StatusCode::INTERNAL_SERVER_ERROR,
    code: ErrorCode::InternalError,
    message: ClientMessage::Fixed(GENERIC_INTERNAL_MESSAGE),
};

/// Classify a fault. Never fails; unknown faults map to 500.
///
/// `Fault::Cancelled` is not an application failure and callers are
/// expected to handle it before classifying; if passed here it is
/// treated as unclassified.
#[must_use]
pub fn classify(fault: &Fault) -> Classification {
    RULES
        .iter()
        .find(|rule| (rule.matches)(fault))
        .unwrap_or(&UNCLASSIFIED)
        .apply(fault)
}

fn io_kind(fault: &Fault) -> Option<io::ErrorKind> {
    match fault {
        Fault::Internal(err) => err
            .chain()
            .find_map(|cause| cause.downcast_ref::<io::Error>())
            .map(io::Error::kind),
        _ => None,
    }
}

fn is_missing_value(fault: &Fault) -> bool {
    matches!(fault, Fault::Validation(ValidationError::Missing { .. }))
}

fn is_malformed_input(fault: &Fault) -> bool {
    matches!(fault, Fault::Validation(_))
        || matches!(
            io_kind(fault),
            Some(io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData)
        )
}

fn is_invalid_operation(fault: &Fault) -> bool {
    matches!(fault, Fault::InvalidOperation(_))
}

fn is_access_denied(fault: &Fault) -> bool {
    matches!(fault, Fault::Unauthorized { .. })
        || io_kind(fault) == Some(io::ErrorKind::PermissionDenied)
}

fn is_resource_absent(fault: &Fault) -> bool {
    matches!(fault, Fault::NotFound { .. }) || io_kind(fault) == Some(io::ErrorKind::NotFound)
}
