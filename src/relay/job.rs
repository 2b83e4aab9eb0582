//! Execution of a single accepted job.
//!
//! A job is strictly sequential: fetch, upload, clean up, notify. Every error
//! from the first two steps, including a panic, turns into a failure
//! notification; nothing escapes the spawned task.

use crate::error::Result;
use crate::types::{Event, JobId, JobRequest, Notification, Stage, StoredObjectId};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;

use super::RelayService;

/// Result of the fetch and upload steps
struct Transfer {
    file_id: StoredObjectId,
    size_bytes: u64,
}

impl RelayService {
    /// Run one job to completion
    pub(crate) async fn run_job(&self, id: JobId, request: JobRequest) {
        let staged = self.pipeline.staging.allocate(&request.display_name);

        let outcome = AssertUnwindSafe(self.transfer(id, &request, staged.path()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_message(panic)));

        self.set_stage(id, Stage::Cleaning);
        // release() logs its own failure; cleanup never changes the outcome
        let _ = staged.release().await;

        let endpoint = &self.config.notifications.endpoint_name;
        let notification = match outcome {
            Ok(transfer) => {
                tracing::info!(
                    job_id = %id,
                    file_id = %transfer.file_id,
                    size_bytes = transfer.size_bytes,
                    "job completed"
                );
                self.emit_event(Event::Completed {
                    id,
                    file_id: transfer.file_id.0.clone(),
                    size_bytes: transfer.size_bytes,
                });
                self.set_stage(id, Stage::NotifyingSuccess);
                Notification::success(endpoint, &request.correlation_id, &transfer.file_id)
            }
            Err(message) => {
                tracing::error!(job_id = %id, error = %message, "job failed");
                self.emit_event(Event::Failed {
                    id,
                    error: message.clone(),
                });
                self.set_stage(id, Stage::NotifyingFailure);
                Notification::failure(endpoint, &request.correlation_id, message)
            }
        };

        self.deliver(id, &request.callback_url, &notification).await;
        self.set_stage(id, Stage::Done);
    }

    async fn transfer(
        &self,
        id: JobId,
        request: &JobRequest,
        path: &Path,
    ) -> std::result::Result<Transfer, String> {
        self.fetch_and_upload(id, request, path)
            .await
            .map_err(|e| e.to_string())
    }

    async fn fetch_and_upload(
        &self,
        id: JobId,
        request: &JobRequest,
        path: &Path,
    ) -> Result<Transfer> {
        self.set_stage(id, Stage::Fetching);
        let size_bytes = self
            .pipeline
            .fetcher
            .fetch(&request.source_url, path)
            .await?;

        self.set_stage(id, Stage::Uploading);
        let file_id = self
            .pipeline
            .storage
            .upload(path, &request.display_name, &request.target_container)
            .await?;

        Ok(Transfer {
            file_id,
            size_bytes,
        })
    }

    /// Post the terminal notification once; failures are logged, not retried
    async fn deliver(&self, id: JobId, url: &str, notification: &Notification) {
        if let Err(e) = self.pipeline.notifier.notify(url, notification).await {
            tracing::warn!(job_id = %id, url = %url, error = %e, "notification failed");
            self.emit_event(Event::NotificationFailed {
                id,
                url: url.to_string(),
                error: e.to_string(),
            });
        }
    }

    fn set_stage(&self, id: JobId, stage: Stage) {
        tracing::debug!(job_id = %id, stage = %stage, "job stage changed");
        self.emit_event(Event::StageChanged { id, stage });
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("internal error: {detail}")
}
