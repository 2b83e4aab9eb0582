//! Job admission.

use crate::error::{Error, Result};
use crate::types::{Event, JobId, JobRequest};
use std::sync::atomic::Ordering;

use super::RelayService;

impl RelayService {
    /// Accept a validated job and start it in the background
    ///
    /// Returns as soon as the job has a slot; fetching, uploading and
    /// notifying all happen afterwards on a spawned task. Nothing is queued:
    /// when every slot is taken the submission is rejected with
    /// [`Error::AtCapacity`].
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun
    /// - [`Error::AtCapacity`] when `max_concurrent_jobs` jobs are in flight
    pub fn submit(&self, request: JobRequest) -> Result<JobId> {
        if !self.state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let permit = match self.state.job_limit.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(
                    correlation_id = %request.correlation_id,
                    limit = self.config.staging.max_concurrent_jobs,
                    "rejecting job: all slots busy"
                );
                return Err(Error::AtCapacity {
                    limit: self.config.staging.max_concurrent_jobs,
                });
            }
        };

        let id = JobId(self.state.next_job_id.fetch_add(1, Ordering::SeqCst));

        tracing::info!(
            job_id = %id,
            correlation_id = %request.correlation_id,
            source = %request.source_url,
            display_name = %request.display_name,
            "job accepted"
        );
        self.emit_event(Event::Accepted {
            id,
            correlation_id: request.correlation_id.clone(),
        });

        let service = self.clone();
        tokio::spawn(async move {
            // Slot is released when the job finishes, whatever the outcome
            let _permit = permit;
            service.run_job(id, request).await;
        });

        Ok(id)
    }
}
