//! # drive-relay
//!
//! Relays remotely hosted files into Google Drive and reports the outcome to
//! a caller-supplied webhook.
//!
//! ## How a job runs
//!
//! 1. `POST /gdrive-upload` names a source URL, a display name, a Drive
//!    folder, a correlation id and a callback URL.
//! 2. The request is validated and acknowledged with `202 Processing` right
//!    away; the work happens on a background task.
//! 3. The file is streamed into a uniquely named staging file, uploaded to
//!    Drive with a resumable session, and the staging file is removed.
//! 4. Exactly one notification (`code` 200 with the Drive file id, or 500
//!    with the error text) is posted to the callback URL.
//!
//! ## Quick Start
//!
//! ```no_run
//! use drive_relay::{Config, RelayService, api};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_env()?);
//!     let relay = Arc::new(RelayService::new((*config).clone()).await?);
//!
//!     // Log every job event
//!     let mut events = relay.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     api::start_api_server(relay.clone(), config, drive_relay::wait_for_signal()).await?;
//!     relay.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Streaming fetch of source files
pub mod fetch;
/// Staging file names
pub mod naming;
/// Callback notifications
pub mod notifier;
/// Job orchestration (decomposed into focused submodules)
pub mod relay;
/// Staging directory and staged file guard
pub mod staging;
/// Storage backends
pub mod storage;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{
    ApiResponse, Error, FetchError, NotifyError, Result, ToHttpStatus, UploadError,
};
pub use relay::RelayService;
pub use storage::{DriveBackend, StorageBackend};
pub use types::{Event, JobId, JobRequest, Notification, Stage, StoredObjectId};

/// Resolve once the process receives a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Resolve once the process receives Ctrl+C.
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
