//! Application state for the API server

use crate::{Config, RelayService};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The relay service jobs are submitted to
    pub relay: Arc<RelayService>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(relay: Arc<RelayService>, config: Arc<Config>) -> Self {
        Self { relay, config }
    }
}
