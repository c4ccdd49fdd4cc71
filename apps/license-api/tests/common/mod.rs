//! Shared helpers for license-api integration tests.

use axum::Router;
use license_api::store::InMemoryLicenseStore;
use license_api::{build_router, AppState};
use licensa_pipeline::Pipeline;
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT: Once = Once::new();

/// Initialize logging for tests (once). Output only appears with `RUST_LOG`.
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// Full application router over an empty in-memory store.
pub fn app() -> Router {
    init_test_logging();
    let pipeline = Pipeline::builder().build().unwrap();
    let state = AppState::new(Arc::new(InMemoryLicenseStore::new()));
    build_router(state, pipeline, Duration::from_secs(5))
}
