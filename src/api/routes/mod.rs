//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`upload`] — Job submission
//! - [`system`] — Health, events, OpenAPI

use serde::Serialize;

mod system;
mod upload;

// Re-export all handlers so `routes::function_name` continues to work
pub use system::*;
pub use upload::*;

/// Response for GET /health
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests
    pub status: String,
    /// Crate version
    pub version: String,
    /// Jobs currently holding a slot
    pub active_jobs: usize,
    /// Configured slot count
    pub max_concurrent_jobs: usize,
    /// False once shutdown has begun
    pub accepting_jobs: bool,
}
