//! Validated Identifiers
//!
//! Newtypes for the identifiers that travel with every request. A value of
//! these types has already passed validation, so downstream code never
//! re-checks the raw string.
//!
//! # Example
//!
//! ```
//! use licensa_core::{RequestId, TenantId};
//!
//! assert!(TenantId::is_valid("acme_corp-01"));
//! assert!(!TenantId::is_valid("TEN 001"));
//!
//! let request_id = RequestId::new();
//! assert!(!request_id.as_str().is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of a tenant identifier, in characters.
pub const MAX_TENANT_ID_LEN: usize = 50;

/// Maximum length accepted for an inbound correlation id.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Error type for tenant id parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseTenantIdError {
    /// The value was empty.
    #[error("tenant id cannot be empty")]
    Empty,

    /// The value exceeded [`MAX_TENANT_ID_LEN`] characters.
    #[error("tenant id is {len} characters long, maximum is {MAX_TENANT_ID_LEN}")]
    TooLong {
        /// Length of the rejected value, in characters
        len: usize,
    },

    /// The value contained a character outside `[A-Za-z0-9_-]`.
    #[error("tenant id contains invalid character {ch:?} at position {position}")]
    InvalidCharacter {
        /// The offending character
        ch: char,
        /// Zero-based character position
        position: usize,
    },
}

/// Identifier of the tenant a request belongs to.
///
/// A tenant id is 1 to 50 characters drawn from ASCII letters, digits, `-`
/// and `_`. There is no way to mutate a `TenantId` after construction, so a
/// validated value stays valid for the lifetime of the request.
///
/// # Example
///
/// ```
/// use licensa_core::TenantId;
///
/// let tenant = TenantId::parse("TEN-001").unwrap();
/// assert_eq!(tenant.to_string(), "TEN-001");
///
/// assert!(TenantId::parse("").is_err());
/// assert!(TenantId::parse("ten/001").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parses and validates a tenant id.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseTenantIdError`] describing the first rule the value
    /// breaks.
    pub fn parse(value: &str) -> std::result::Result<Self, ParseTenantIdError> {
        Self::check(value)?;
        Ok(Self(value.to_string()))
    }

    /// Returns true if `value` is a well-formed tenant id.
    #[must_use]
    pub fn is_valid(value: &str) -> bool {
        Self::check(value).is_ok()
    }

    /// Returns the tenant id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn check(value: &str) -> std::result::Result<(), ParseTenantIdError> {
        if value.is_empty() {
            return Err(ParseTenantIdError::Empty);
        }

        let mut len = 0;
        for (position, ch) in value.chars().enumerate() {
            if !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
                return Err(ParseTenantIdError::InvalidCharacter { ch, position });
            }
            len = position + 1;
        }

        if len > MAX_TENANT_ID_LEN {
            return Err(ParseTenantIdError::TooLong { len });
        }
        Ok(())
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = ParseTenantIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = ParseTenantIdError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::check(&value)?;
        Ok(Self(value))
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Correlation identifier of a single inbound request.
///
/// Either adopted from the hosting layer (an `x-request-id` header) or
/// generated here as a UUID v4. Opaque to everything except logs and the
/// `traceId` field of error responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new random request id using UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Adopts an id supplied by the hosting layer.
    ///
    /// Returns `None` if the value is empty, longer than 128 characters, or
    /// contains anything other than visible ASCII.
    #[must_use]
    pub fn from_external(value: &str) -> Option<Self> {
        let usable = !value.is_empty()
            && value.len() <= MAX_REQUEST_ID_LEN
            && value.bytes().all(|b| b.is_ascii_graphic());
        usable.then(|| Self(value.to_string()))
    }

    /// Returns the request id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
