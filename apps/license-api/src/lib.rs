//! Licensa license API.
//!
//! Tenant-scoped license management served behind the Licensa request
//! pipeline. The binary in `main.rs` wires configuration, logging and the
//! router together; the pieces live here so integration tests can build the
//! same router.

pub mod config;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;

pub use routes::{build_router, AppState, SERVICE_NAME};
