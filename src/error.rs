//! Error types for drive-relay
//!
//! This module provides the error handling for the service, including:
//! - Stage-specific error types (fetch, upload, notify)
//! - HTTP status code mapping for synchronous API replies
//! - The `{code, message}` body shape shared by every synchronous response

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for drive-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for drive-relay
///
/// Synchronous variants (`MissingParameter`, `InvalidParameter`, `Unauthorized`,
/// `AtCapacity`, `ShuttingDown`) are returned straight to the submitting caller.
/// Stage variants (`Fetch`, `Upload`) only occur inside a running job and are
/// turned into a failure notification there. Callback delivery failures stay
/// as [`NotifyError`] since they end a job without changing its outcome.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "API_KEY")
        key: Option<String>,
    },

    /// One or more required job fields are absent or empty
    #[error("Missing required parameters")]
    MissingParameter,

    /// A job field is present but unusable
    #[error("invalid parameter '{field}': {reason}")]
    InvalidParameter {
        /// Wire name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// API key missing or wrong
    #[error("Unauthorized")]
    Unauthorized,

    /// Every job slot is taken
    #[error("server busy: {limit} jobs already in flight")]
    AtCapacity {
        /// Configured maximum number of concurrent jobs
        limit: usize,
    },

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Fetching the source file failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Uploading to the storage backend failed
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Errors raised while streaming a remote file into the staging area
#[derive(Debug, Error)]
pub enum FetchError {
    /// Remote server answered with a non-success status
    #[error("failed to fetch {url}: HTTP {status}")]
    Status {
        /// The requested URL
        url: String,
        /// The status line reported by the server (e.g. "404 Not Found")
        status: String,
    },

    /// Connection, timeout or body read failure
    #[error("failed to fetch {url}: {reason}")]
    Transport {
        /// The requested URL
        url: String,
        /// Underlying transport error text
        reason: String,
    },

    /// Writing the staged file failed
    #[error("failed to write staged file {path}: {reason}")]
    Write {
        /// Staged file path
        path: PathBuf,
        /// Underlying I/O error text
        reason: String,
    },
}

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum UploadError {
    /// Credentials could not be loaded or an access token could not be obtained
    #[error("storage authentication failed: {0}")]
    Auth(String),

    /// The backend refused the request (quota, permission, bad folder, ...)
    #[error("storage backend rejected upload (HTTP {status}): {body}")]
    Rejected {
        /// HTTP status code returned by the backend
        status: u16,
        /// Error detail returned by the backend
        body: String,
    },

    /// Network failure talking to the backend
    #[error("storage transport error: {0}")]
    Transport(String),

    /// Reading the staged file failed
    #[error("failed to read staged file {path}: {reason}")]
    Io {
        /// Staged file path
        path: PathBuf,
        /// Underlying I/O error text
        reason: String,
    },

    /// The backend reported success without an object id
    #[error("storage backend returned no object id")]
    MissingObjectId,
}

/// Errors raised while delivering the callback notification
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Callback endpoint answered with a non-success status
    #[error("callback {url} returned HTTP {status}")]
    Status {
        /// Callback URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Callback endpoint could not be reached
    #[error("failed to deliver callback to {url}: {reason}")]
    Transport {
        /// Callback URL
        url: String,
        /// Underlying transport error text
        reason: String,
    },
}

/// Body of every synchronous API reply
///
/// # Example JSON Response
///
/// ```json
/// { "code": 400, "message": "Missing required parameters" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse {
    /// HTTP status code, repeated in the body
    pub code: u16,
    /// Human-readable message
    pub message: String,
}

impl ApiResponse {
    /// Create a new response body
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The 202 acknowledgment for an accepted job
    pub fn processing() -> Self {
        Self::new(202, "Processing")
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code (used in logs)
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::MissingParameter => 400,
            Error::InvalidParameter { .. } => 400,

            // 401 Unauthorized
            Error::Unauthorized => 401,

            // 503 Service Unavailable
            Error::AtCapacity { .. } => 503,
            Error::ShuttingDown => 503,

            // 502 Bad Gateway - External service errors
            Error::Fetch(_) => 502,
            Error::Upload(_) => 502,

            // 500 Internal Server Error - Server-side issues
            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::MissingParameter => "missing_parameter",
            Error::InvalidParameter { .. } => "invalid_parameter",
            Error::Unauthorized => "unauthorized",
            Error::AtCapacity { .. } => "at_capacity",
            Error::ShuttingDown => "shutting_down",
            Error::Fetch(_) => "fetch_failed",
            Error::Upload(_) => "upload_failed",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiResponse {
    fn from(error: Error) -> Self {
        ApiResponse::new(error.status_code(), error.to_string())
    }
}
