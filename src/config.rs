//! Configuration types for drive-relay
//!
//! Configuration is read once at startup (see [`Config::from_env`]) and then
//! shared read-only as `Arc<Config>`. Nothing mutates it afterwards.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Drive resumable uploads require chunk sizes in multiples of 256 KiB
pub const UPLOAD_CHUNK_GRANULARITY: usize = 256 * 1024;

/// Largest upload chunk held in memory at once
pub const MAX_UPLOAD_CHUNK_SIZE: usize = 256 * 1024 * 1024;

/// Staging area and job execution settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StagingConfig {
    /// Directory holding files between download and upload (default: "/tmp/")
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Maximum jobs in flight at once; further submissions are rejected (default: 8)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Overall timeout for fetching a source file (None = client default)
    #[serde(default, with = "optional_duration_serde")]
    pub fetch_timeout: Option<Duration>,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            fetch_timeout: None,
        }
    }
}

/// Google Drive backend settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Base64-encoded service account key JSON
    #[serde(default, skip_serializing)]
    pub credentials: String,

    /// Account the service identity acts on behalf of (domain-wide delegation)
    #[serde(default)]
    pub delegated_user: String,

    /// Size of each resumable upload chunk in bytes (default: 8 MiB)
    #[serde(default = "default_upload_chunk_size")]
    pub upload_chunk_size: usize,

    /// Drive API base URL (default: "https://www.googleapis.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Overrides the token endpoint named in the service account key
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credentials: String::new(),
            delegated_user: String::new(),
            upload_chunk_size: default_upload_chunk_size(),
            api_base: default_api_base(),
            token_uri: None,
        }
    }
}

impl StorageConfig {
    /// Upload chunk size rounded down to the Drive granularity, between one unit
    /// and [`MAX_UPLOAD_CHUNK_SIZE`]
    pub fn effective_chunk_size(&self) -> usize {
        let units = (self.upload_chunk_size.min(MAX_UPLOAD_CHUNK_SIZE) / UPLOAD_CHUNK_GRANULARITY)
            .max(1);
        units * UPLOAD_CHUNK_GRANULARITY
    }
}

/// Callback notification settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationConfig {
    /// Value of the `endpoint` field in every notification (default: "/gdrive-upload")
    #[serde(default = "default_endpoint_name")]
    pub endpoint_name: String,

    /// Timeout for callback requests (default: 30 seconds)
    #[serde(default = "default_notify_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            endpoint_name: default_endpoint_name(),
            timeout: default_notify_timeout(),
        }
    }
}

/// Main configuration for the relay service
///
/// Fields are organized into logical sub-configs:
/// - [`staging`](StagingConfig) — staging directory, concurrency bound
/// - [`storage`](StorageConfig) — Drive credentials and endpoints
/// - [`notifications`](NotificationConfig) — callback payload and timeout
/// - [`server`](ServerIntegrationConfig) — HTTP listener and API key
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Staging area and job execution settings
    #[serde(default)]
    pub staging: StagingConfig,

    /// Storage backend settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Callback notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Shared secret expected in the X-API-Key header
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: false)
    #[serde(default)]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: false,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
        }
    }
}

impl Config {
    /// Build the configuration from the process environment
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// | Variable              | Field                              | Required |
    /// |-----------------------|------------------------------------|----------|
    /// | `API_KEY`             | `server.api.api_key`               | yes      |
    /// | `GCP_SA_CREDENTIALS`  | `storage.credentials`              | yes      |
    /// | `GDRIVE_USER`         | `storage.delegated_user`           | yes      |
    /// | `STORAGE_PATH`        | `staging.staging_dir`              | no       |
    /// | `BIND_ADDRESS`        | `server.api.bind_address`          | no       |
    /// | `MAX_CONCURRENT_JOBS` | `staging.max_concurrent_jobs`      | no       |
    /// | `FETCH_TIMEOUT_SECS`  | `staging.fetch_timeout`            | no       |
    /// | `UPLOAD_CHUNK_SIZE`   | `storage.upload_chunk_size`        | no       |
    /// | `NOTIFY_ENDPOINT`     | `notifications.endpoint_name`      | no       |
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            tracing::warn!(error = %e, "failed to load .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| Error::Config {
                message: format!("environment variable {key} is not set"),
                key: Some(key.to_string()),
            })
        };

        let mut config = Config::default();

        config.server.api.api_key = Some(required("API_KEY")?);
        config.storage.credentials = required("GCP_SA_CREDENTIALS")?;
        config.storage.delegated_user = required("GDRIVE_USER")?;

        if let Some(path) = get("STORAGE_PATH") {
            config.staging.staging_dir = PathBuf::from(path);
        }
        if let Some(addr) = get("BIND_ADDRESS") {
            config.server.api.bind_address = parse_value("BIND_ADDRESS", &addr)?;
        }
        if let Some(limit) = get("MAX_CONCURRENT_JOBS") {
            config.staging.max_concurrent_jobs = parse_value("MAX_CONCURRENT_JOBS", &limit)?;
        }
        if let Some(secs) = get("FETCH_TIMEOUT_SECS") {
            let secs: u64 = parse_value("FETCH_TIMEOUT_SECS", &secs)?;
            config.staging.fetch_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(size) = get("UPLOAD_CHUNK_SIZE") {
            config.storage.upload_chunk_size = parse_value("UPLOAD_CHUNK_SIZE", &size)?;
        }
        if let Some(name) = get("NOTIFY_ENDPOINT") {
            config.notifications.endpoint_name = name;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.staging.max_concurrent_jobs == 0 {
            return Err(Error::Config {
                message: "max_concurrent_jobs must be at least 1".to_string(),
                key: Some("MAX_CONCURRENT_JOBS".to_string()),
            });
        }
        if self.storage.upload_chunk_size < UPLOAD_CHUNK_GRANULARITY {
            return Err(Error::Config {
                message: format!(
                    "upload_chunk_size must be at least {} bytes",
                    UPLOAD_CHUNK_GRANULARITY
                ),
                key: Some("UPLOAD_CHUNK_SIZE".to_string()),
            });
        }
        if self.storage.upload_chunk_size > MAX_UPLOAD_CHUNK_SIZE {
            return Err(Error::Config {
                message: format!(
                    "upload_chunk_size must be at most {} bytes",
                    MAX_UPLOAD_CHUNK_SIZE
                ),
                key: Some("UPLOAD_CHUNK_SIZE".to_string()),
            });
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| Error::Config {
        message: format!("invalid value for {key}: {e}"),
        key: Some(key.to_string()),
    })
}

// Default value functions
fn default_staging_dir() -> PathBuf {
    PathBuf::from("/tmp/")
}

fn default_max_concurrent_jobs() -> usize {
    8
}

fn default_upload_chunk_size() -> usize {
    8 * 1024 * 1024
}

fn default_api_base() -> String {
    "https://www.googleapis.com".to_string()
}

fn default_endpoint_name() -> String {
    "/gdrive-upload".to_string()
}

fn default_notify_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
