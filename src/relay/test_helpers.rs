//! Shared test helpers for creating RelayService instances in tests.

use crate::config::Config;
use crate::error::UploadError;
use crate::relay::RelayService;
use crate::storage::StorageBackend;
use crate::types::{Event, StoredObjectId};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{Semaphore, broadcast};

/// What the mock backend does when asked to upload
#[derive(Clone, Debug)]
pub(crate) enum MockOutcome {
    Succeed(&'static str),
    Reject(u16, &'static str),
    Panic,
}

/// An upload the mock backend received
#[derive(Clone, Debug)]
pub(crate) struct RecordedUpload {
    pub(crate) path: PathBuf,
    pub(crate) display_name: String,
    pub(crate) container: String,
    pub(crate) contents: Vec<u8>,
}

/// In-memory storage backend
pub(crate) struct MockBackend {
    outcome: MockOutcome,
    gate: Option<Arc<Semaphore>>,
    pub(crate) uploads: Mutex<Vec<RecordedUpload>>,
}

impl MockBackend {
    pub(crate) fn new(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            gate: None,
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Uploads block until a permit is added to `gate`
    pub(crate) fn gated(outcome: MockOutcome, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(outcome)
        }
    }

    pub(crate) fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(
        &self,
        path: &Path,
        display_name: &str,
        container: &str,
    ) -> Result<StoredObjectId, UploadError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let contents = tokio::fs::read(path).await.unwrap_or_default();
        self.uploads.lock().unwrap().push(RecordedUpload {
            path: path.to_path_buf(),
            display_name: display_name.to_string(),
            container: container.to_string(),
            contents,
        });

        match &self.outcome {
            MockOutcome::Succeed(id) => Ok(StoredObjectId(id.to_string())),
            MockOutcome::Reject(status, body) => Err(UploadError::Rejected {
                status: *status,
                body: body.to_string(),
            }),
            MockOutcome::Panic => panic!("backend exploded"),
        }
    }
}

/// Config rooted in a temp staging dir
pub(crate) fn test_config(temp_dir: &TempDir, max_concurrent_jobs: usize) -> Config {
    let mut config = Config::default();
    config.staging.staging_dir = temp_dir.path().join("staging");
    config.staging.max_concurrent_jobs = max_concurrent_jobs;
    config.staging.fetch_timeout = Some(Duration::from_secs(10));
    config.notifications.timeout = Duration::from_secs(5);
    config.server.api.api_key = Some("test-key".to_string());
    config
}

/// Create a RelayService over the given backend.
/// Returns the service and the tempdir (which must be kept alive).
pub(crate) async fn create_test_relay(
    backend: Arc<MockBackend>,
    max_concurrent_jobs: usize,
) -> (RelayService, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = test_config(&temp_dir, max_concurrent_jobs);
    let relay = RelayService::with_backend(config, backend).await.unwrap();
    (relay, temp_dir)
}

/// Wait for the first event matching `pred`, failing after 10 seconds
pub(crate) async fn wait_for_event<F>(rx: &mut broadcast::Receiver<Event>, pred: F) -> Event
where
    F: Fn(&Event) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Files currently in the staging directory
pub(crate) fn staged_files(relay: &RelayService) -> Vec<PathBuf> {
    std::fs::read_dir(relay.pipeline.staging.dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}
