//! Job orchestration split into focused submodules.
//!
//! The `RelayService` struct and its methods are organized by concern:
//! - [`submit`] - Admission: shutdown gate, capacity check, job spawning
//! - [`job`] - Fetch, upload, cleanup and notification for one job
//! - [`lifecycle`] - Shutdown coordination

mod job;
mod lifecycle;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::notifier::Notifier;
use crate::staging::StagingArea;
use crate::storage::{DriveBackend, StorageBackend};
use crate::types::Event;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Semaphore, broadcast};

/// Admission state shared by every clone of the service
#[derive(Clone)]
pub(crate) struct JobState {
    /// One permit per job slot (sized by max_concurrent_jobs)
    pub(crate) job_limit: Arc<Semaphore>,
    /// Set to false once shutdown begins
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Source of process-local job ids
    pub(crate) next_job_id: Arc<AtomicU64>,
}

/// The stages a job runs through
#[derive(Clone)]
pub(crate) struct JobPipeline {
    pub(crate) staging: StagingArea,
    pub(crate) fetcher: Fetcher,
    pub(crate) storage: Arc<dyn StorageBackend>,
    pub(crate) notifier: Notifier,
}

/// Relay service instance (cloneable - all fields are Arc-wrapped or cheap to clone)
#[derive(Clone)]
pub struct RelayService {
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    pub(crate) state: JobState,
    pub(crate) pipeline: JobPipeline,
}

impl RelayService {
    /// Create a relay service uploading to Google Drive
    ///
    /// This initializes all core components:
    /// - Creates the staging directory
    /// - Decodes the service account credentials
    /// - Sets up the shared HTTP client and event channel
    pub async fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::new();
        let backend = DriveBackend::from_config(client.clone(), &config.storage)?;
        Self::build(config, client, Arc::new(backend)).await
    }

    /// Create a relay service uploading through a custom backend
    pub async fn with_backend(config: Config, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        Self::build(config, reqwest::Client::new(), storage).await
    }

    async fn build(
        config: Config,
        client: reqwest::Client,
        storage: Arc<dyn StorageBackend>,
    ) -> Result<Self> {
        config.validate()?;

        let staging = StagingArea::open(&config.staging.staging_dir).await?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = broadcast::channel(1000);

        let pipeline = JobPipeline {
            staging,
            fetcher: Fetcher::new(client.clone(), config.staging.fetch_timeout),
            storage,
            notifier: Notifier::new(client, config.notifications.timeout),
        };

        let state = JobState {
            job_limit: Arc::new(Semaphore::new(config.staging.max_concurrent_jobs)),
            accepting_new: Arc::new(AtomicBool::new(true)),
            next_job_id: Arc::new(AtomicU64::new(1)),
        };

        tracing::info!(
            backend = pipeline.storage.name(),
            staging_dir = %pipeline.staging.dir().display(),
            max_concurrent_jobs = config.staging.max_concurrent_jobs,
            "Relay service initialized"
        );

        Ok(Self {
            event_tx,
            config: Arc::new(config),
            state,
            pipeline,
        })
    }

    /// Subscribe to job events
    ///
    /// Each subscriber receives all events independently. A subscriber that
    /// falls more than 1000 events behind gets `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use drive_relay::{Config, RelayService};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let relay = RelayService::new(Config::from_env()?).await?;
    ///
    ///     let mut events = relay.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "job event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Number of jobs currently holding a slot
    pub fn active_jobs(&self) -> usize {
        self.config
            .staging
            .max_concurrent_jobs
            .saturating_sub(self.state.job_limit.available_permits())
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.state.accepting_new.load(Ordering::SeqCst)
    }

    /// Emit an event to all subscribers
    ///
    /// With no subscribers the event is dropped; jobs never depend on anyone listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
