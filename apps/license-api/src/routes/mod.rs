//! HTTP routes and router assembly.

mod health;
mod licenses;

pub use health::HealthResponse;

use axum::Router;
use licensa_pipeline::{Pipeline, PipelineLayer};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;

use crate::store::LicenseStore;

/// Name reported by the health endpoints.
pub const SERVICE_NAME: &str = "license-api";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LicenseStore>,
    pub service_name: &'static str,
}

impl AppState {
    pub fn new(store: Arc<dyn LicenseStore>) -> Self {
        Self {
            store,
            service_name: SERVICE_NAME,
        }
    }
}

/// Build the application router.
///
/// Layers, outermost first: request id assignment, request id echo,
/// request timeout, request pipeline. A timed-out request is dropped
/// inside the pipeline and logged as cancelled.
pub fn build_router(state: AppState, pipeline: Pipeline, request_timeout: Duration) -> Router {
    Router::new()
        .merge(health::health_routes())
        .merge(licenses::license_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(PipelineLayer::new(pipeline)),
        )
}
