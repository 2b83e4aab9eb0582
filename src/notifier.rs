//! Callback delivery for terminal job notifications.
//!
//! Each job posts exactly one [`Notification`] to its callback URL. Delivery
//! is attempted once; a failure is reported to the caller of [`Notifier::notify`]
//! and never retried.

use crate::error::NotifyError;
use crate::types::Notification;
use std::time::Duration;

/// Posts notifications as JSON to caller-supplied URLs
#[derive(Clone, Debug)]
pub struct Notifier {
    client: reqwest::Client,
    timeout: Duration,
}

impl Notifier {
    /// Create a notifier sharing the given HTTP client
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// POST `notification` to `url`
    ///
    /// Any 2xx answer counts as delivered.
    pub async fn notify(&self, url: &str, notification: &Notification) -> Result<(), NotifyError> {
        let request = self.client.post(url).json(notification).timeout(self.timeout);

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(url = %url, code = notification.code, "notification delivered");
                Ok(())
            }
            Ok(response) => Err(NotifyError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            }),
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timed out after {:?}", self.timeout)
                } else {
                    e.to_string()
                };
                Err(NotifyError::Transport {
                    url: url.to_string(),
                    reason,
                })
            }
        }
    }
}
