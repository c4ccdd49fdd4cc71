//! # licensa-pipeline
//!
//! Tower/Axum middleware that puts every request of a Licensa service through
//! the same three stages, outermost first:
//!
//! 1. **Fault boundary** - turns any fault or panic into a uniform JSON
//!    error envelope with a classified status code
//! 2. **Observability** - logs request start and end with correlation fields,
//!    timing and (for small bodies) the request body
//! 3. **Tenant resolution** - reads and validates `X-Tenant-ID`, failing
//!    closed with 400 `MISSING_TENANT` outside the exempt paths
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axum::{routing::get, Extension, Router};
//! use licensa_core::TenantId;
//! use licensa_pipeline::{Pipeline, PipelineConfig, PipelineLayer};
//!
//! async fn list_licenses(Extension(tenant): Extension<TenantId>) -> String {
//!     format!("Licenses for tenant: {tenant}")
//! }
//!
//! let pipeline = Pipeline::builder()
//!     .config(PipelineConfig::default())
//!     .build()?;
//!
//! let app = Router::new()
//!     .route("/api/licenses", get(list_licenses))
//!     .layer(PipelineLayer::new(pipeline));
//! ```
//!
//! ## Raising faults from handlers
//!
//! Handlers return `licensa_core::Result<T>`. A returned
//! [`Fault`](licensa_core::Fault) is carried back to the fault boundary and
//! classified:
//!
//! | Fault | Status | Code |
//! |-------|--------|------|
//! | missing or malformed input | 400 | `VALIDATION_ERROR` |
//! | invalid operation | 400 | `INVALID_OPERATION` |
//! | unauthorized | 401 | `UNAUTHORIZED` |
//! | not found | 404 | `NOT_FOUND` |
//! | anything else, panics included | 500 | `INTERNAL_ERROR` |
//!
//! `Fault::Cancelled` yields a bodiless 499.

pub mod classify;
pub mod config;
pub mod context;
pub mod fault;
pub mod layer;
pub mod observability;
pub mod pipeline;
pub mod service;
pub mod stage;
pub mod tenant;

pub use classify::{classify, Classification, GENERIC_INTERNAL_MESSAGE};
pub use config::{
    ConfigError, PipelineConfig, PipelineConfigBuilder, DEFAULT_BODY_CAPTURE_LIMIT,
    DEFAULT_TENANT_HEADER, MAX_BODY_CAPTURE_LIMIT,
};
pub use context::{ContextError, RequestContext, REQUEST_ID_HEADER, UNKNOWN_TENANT};
pub use fault::{client_closed_request, FaultBoundaryStage};
pub use layer::PipelineLayer;
pub use observability::ObservabilityStage;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use service::PipelineService;
pub use stage::{endpoint_fn, Endpoint, FnEndpoint, Next, Stage};
pub use tenant::{RejectReason, TenantResolution, TenantResolutionStage};
