//! Core types for drive-relay

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Process-local identifier for an accepted job
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier the storage backend assigned to an uploaded object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct StoredObjectId(pub String);

impl std::fmt::Display for StoredObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated job submission
///
/// Field names on the wire follow the public API (`file_url`, `filename`,
/// `folder_id`, `id`, `webhook_url`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobRequest {
    /// Location of the remote file (http or https)
    #[serde(rename = "file_url")]
    pub source_url: String,

    /// Name the stored object carries in the backend
    #[serde(rename = "filename")]
    pub display_name: String,

    /// Destination folder in the backend
    #[serde(rename = "folder_id")]
    pub target_container: String,

    /// Caller token echoed back in the notification
    #[serde(rename = "id")]
    pub correlation_id: String,

    /// Endpoint receiving the terminal notification
    #[serde(rename = "webhook_url")]
    pub callback_url: String,
}

impl JobRequest {
    /// Wire names of every required field
    pub const REQUIRED_FIELDS: [&'static str; 5] =
        ["file_url", "filename", "folder_id", "id", "webhook_url"];

    /// Validate a raw JSON job description
    ///
    /// Every required field must be a non-blank string. Anything else (absent
    /// field, `null`, number, non-object body) is [`Error::MissingParameter`].
    /// The two URL fields must also be absolute http(s) URLs, otherwise
    /// [`Error::InvalidParameter`] names the field.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or(Error::MissingParameter)?;

        let field = |name: &str| -> Result<String> {
            object
                .get(name)
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .ok_or(Error::MissingParameter)
        };

        let request = JobRequest {
            source_url: field("file_url")?,
            display_name: field("filename")?,
            target_container: field("folder_id")?,
            correlation_id: field("id")?,
            callback_url: field("webhook_url")?,
        };

        check_http_url("file_url", &request.source_url)?;
        check_http_url("webhook_url", &request.callback_url)?;

        Ok(request)
    }
}

fn check_http_url(field: &'static str, raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|e| Error::InvalidParameter {
        field,
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidParameter {
            field,
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Terminal message posted to the caller's callback URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    /// Fixed name of the operation that produced this notification
    pub endpoint: String,

    /// Correlation id copied from the job request
    pub id: String,

    /// Stored object id; `null` unless the job succeeded
    pub file_id: Option<String>,

    /// 200 on success, 500 on failure
    pub code: u16,

    /// "Success" or the captured error text
    pub message: String,
}

impl Notification {
    /// Notification for a job whose upload completed
    pub fn success(endpoint: &str, correlation_id: &str, object_id: &StoredObjectId) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            id: correlation_id.to_string(),
            file_id: Some(object_id.0.clone()),
            code: 200,
            message: "Success".to_string(),
        }
    }

    /// Notification for a job that failed at any stage
    pub fn failure(endpoint: &str, correlation_id: &str, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "Unknown error".to_string();
        }
        Self {
            endpoint: endpoint.to_string(),
            id: correlation_id.to_string(),
            file_id: None,
            code: 500,
            message,
        }
    }

    /// Whether this notification reports success
    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

/// Stage a job is currently in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Acknowledged, not started yet
    Accepted,
    /// Streaming the source file into staging
    Fetching,
    /// Pushing the staged file to the backend
    Uploading,
    /// Removing the staged file
    Cleaning,
    /// Posting the success notification
    NotifyingSuccess,
    /// Posting the failure notification
    NotifyingFailure,
    /// Terminal
    Done,
}

impl Stage {
    /// Get the stage name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Accepted => "accepted",
            Stage::Fetching => "fetching",
            Stage::Uploading => "uploading",
            Stage::Cleaning => "cleaning",
            Stage::NotifyingSuccess => "notifying_success",
            Stage::NotifyingFailure => "notifying_failure",
            Stage::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job acknowledged and scheduled
    Accepted {
        /// Job ID
        id: JobId,
        /// Caller correlation id
        correlation_id: String,
    },

    /// Job moved to a new stage
    StageChanged {
        /// Job ID
        id: JobId,
        /// New stage
        stage: Stage,
    },

    /// Upload finished; success notification is being delivered
    Completed {
        /// Job ID
        id: JobId,
        /// Stored object id
        file_id: String,
        /// Bytes fetched from the source
        size_bytes: u64,
    },

    /// Fetch or upload failed; failure notification is being delivered
    Failed {
        /// Job ID
        id: JobId,
        /// Error message sent to the caller
        error: String,
    },

    /// The callback could not be delivered (not retried)
    NotificationFailed {
        /// Job ID
        id: JobId,
        /// Callback URL
        url: String,
        /// Delivery error
        error: String,
    },

    /// Service is shutting down
    Shutdown,
}

impl Event {
    /// Short name used as the SSE event type
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Accepted { .. } => "accepted",
            Event::StageChanged { .. } => "stage_changed",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::NotificationFailed { .. } => "notification_failed",
            Event::Shutdown => "shutdown",
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> serde_json::Value {
        json!({
            "file_url": "https://x/a.pdf",
            "filename": "a.pdf",
            "folder_id": "folder123",
            "id": "abc",
            "webhook_url": "https://caller/hook"
        })
    }

    #[test]
    fn valid_request_maps_wire_names() {
        let request = JobRequest::from_value(&valid_body()).unwrap();

        assert_eq!(request.source_url, "https://x/a.pdf");
        assert_eq!(request.display_name, "a.pdf");
        assert_eq!(request.target_container, "folder123");
        assert_eq!(request.correlation_id, "abc");
        assert_eq!(request.callback_url, "https://caller/hook");
    }

    #[test]
    fn each_missing_field_is_rejected() {
        for field in JobRequest::REQUIRED_FIELDS {
            let mut body = valid_body();
            body.as_object_mut().unwrap().remove(field);

            assert!(
                matches!(JobRequest::from_value(&body), Err(Error::MissingParameter)),
                "removing {field} must be rejected"
            );
        }
    }

    #[test]
    fn empty_null_and_non_string_fields_are_rejected() {
        for bad in [json!(""), json!("   "), json!(null), json!(42), json!(["a"])] {
            let mut body = valid_body();
            body["filename"] = bad.clone();

            assert!(
                matches!(JobRequest::from_value(&body), Err(Error::MissingParameter)),
                "filename = {bad} must be rejected"
            );
        }
    }

    #[test]
    fn non_object_body_is_missing_parameters() {
        for body in [json!(null), json!([]), json!("file_url")] {
            assert!(matches!(
                JobRequest::from_value(&body),
                Err(Error::MissingParameter)
            ));
        }
    }

    #[test]
    fn non_http_urls_are_invalid_parameters() {
        let mut body = valid_body();
        body["file_url"] = json!("file:///etc/passwd");
        match JobRequest::from_value(&body) {
            Err(Error::InvalidParameter { field, .. }) => assert_eq!(field, "file_url"),
            other => panic!("expected invalid parameter, got {other:?}"),
        }

        let mut body = valid_body();
        body["webhook_url"] = json!("not a url");
        match JobRequest::from_value(&body) {
            Err(Error::InvalidParameter { field, .. }) => assert_eq!(field, "webhook_url"),
            other => panic!("expected invalid parameter, got {other:?}"),
        }
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut body = valid_body();
        body["priority"] = json!("high");
        assert!(JobRequest::from_value(&body).is_ok());
    }

    #[test]
    fn success_notification_wire_shape() {
        let notification =
            Notification::success("/gdrive-upload", "abc", &StoredObjectId("f-1".into()));

        assert_eq!(
            serde_json::to_value(&notification).unwrap(),
            json!({
                "endpoint": "/gdrive-upload",
                "id": "abc",
                "file_id": "f-1",
                "code": 200,
                "message": "Success"
            })
        );
    }

    #[test]
    fn failure_notification_has_null_file_id() {
        let notification = Notification::failure("/gdrive-upload", "abc", "HTTP 404 Not Found");
        let json = serde_json::to_value(&notification).unwrap();

        assert!(json["file_id"].is_null(), "file_id must serialize as null");
        assert_eq!(json["code"], 500);
        assert_eq!(json["message"], "HTTP 404 Not Found");
        assert!(!notification.is_success());
    }

    #[test]
    fn failure_notification_message_is_never_empty() {
        let notification = Notification::failure("/gdrive-upload", "abc", "");
        assert!(!notification.message.is_empty());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::StageChanged {
            id: JobId(7),
            stage: Stage::Uploading,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "stage_changed");
        assert_eq!(json["id"], 7);
        assert_eq!(json["stage"], "uploading");
        assert_eq!(event.kind(), "stage_changed");
    }
}
