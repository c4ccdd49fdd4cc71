//! Licensa Core Library
//!
//! Shared types for Licensa services.
//!
//! # Modules
//!
//! - [`ids`] - Validated identifiers (TenantId, RequestId)
//! - [`error`] - Failure taxonomy raised by request handlers (Fault)
//! - [`envelope`] - Wire-level response bodies (ErrorEnvelope, ApiResponse)
//!
//! # Example
//!
//! ```
//! use licensa_core::{Fault, Result, TenantId};
//!
//! let tenant: TenantId = "TEN-001".parse().unwrap();
//! assert_eq!(tenant.as_str(), "TEN-001");
//!
//! fn find_license(id: u64) -> Result<String> {
//!     Err(Fault::not_found("License", Some(id.to_string())))
//! }
//! assert!(find_license(5).is_err());
//! ```

pub mod envelope;
pub mod error;
pub mod ids;

pub use envelope::{ApiResponse, ErrorBody, ErrorCode, ErrorEnvelope};
pub use error::{Fault, RaisedFault, Result, ValidationError};
pub use ids::{ParseTenantIdError, RequestId, TenantId, MAX_TENANT_ID_LEN};
