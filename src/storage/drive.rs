//! Google Drive v3 backend using resumable uploads.
//!
//! Upload sequence:
//! 1. `POST /upload/drive/v3/files?uploadType=resumable` with the file metadata
//!    opens a session; its URI comes back in the `Location` header.
//! 2. The staged file is sent in fixed-size chunks with `Content-Range`
//!    headers. `308 Resume Incomplete` reports how much the server committed
//!    (`Range: bytes=0-N`); `200`/`201` carries the created file's `id`.

use super::StorageBackend;
use super::auth::{ServiceAccountKey, TokenProvider};
use crate::config::StorageConfig;
use crate::error::{Error, UploadError};
use crate::types::StoredObjectId;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE};
use serde::Deserialize;
use std::io::SeekFrom;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Backend error bodies are cut to this many characters
const MAX_ERROR_BODY_CHARS: usize = 1024;

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: Option<String>,
}

/// Uploads staged files into Google Drive folders
pub struct DriveBackend {
    client: reqwest::Client,
    tokens: TokenProvider,
    api_base: String,
    chunk_size: usize,
}

impl DriveBackend {
    /// Build the backend from configuration
    ///
    /// Credentials are decoded and the private key parsed here, so a broken
    /// key stops the service at startup rather than failing every job.
    pub fn from_config(client: reqwest::Client, config: &StorageConfig) -> crate::Result<Self> {
        let key = ServiceAccountKey::from_base64(&config.credentials).map_err(|e| {
            Error::Config {
                message: e.to_string(),
                key: Some("GCP_SA_CREDENTIALS".to_string()),
            }
        })?;
        let tokens = TokenProvider::new(
            client.clone(),
            key,
            config.delegated_user.clone(),
            config.token_uri.clone(),
        )
        .map_err(|e| Error::Config {
            message: e.to_string(),
            key: Some("GCP_SA_CREDENTIALS".to_string()),
        })?;

        tracing::info!(
            client_email = tokens.client_email(),
            delegated_user = %config.delegated_user,
            "Drive backend initialized"
        );

        Ok(Self::new(
            client,
            tokens,
            config.api_base.clone(),
            config.effective_chunk_size(),
        ))
    }

    /// Build the backend from already-constructed parts
    pub fn new(
        client: reqwest::Client,
        tokens: TokenProvider,
        api_base: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            client,
            tokens,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            chunk_size,
        }
    }

    async fn open_session(
        &self,
        token: &str,
        display_name: &str,
        container: &str,
        size: u64,
    ) -> Result<String, UploadError> {
        let url = format!(
            "{}/upload/drive/v3/files?uploadType=resumable&supportsAllDrives=true&fields=id",
            self.api_base
        );
        let mime = mime_guess::from_path(display_name).first_or_octet_stream();

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("X-Upload-Content-Type", mime.as_ref())
            .header("X-Upload-Content-Length", size)
            .json(&serde_json::json!({
                "name": display_name,
                "parents": [container],
            }))
            .send()
            .await
            .map_err(|e| UploadError::Transport(format!("failed to open upload session: {e}")))?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| UploadError::Rejected {
                status: response.status().as_u16(),
                body: "upload session response has no Location header".to_string(),
            })
    }

    async fn send_chunks(
        &self,
        token: &str,
        session_uri: &str,
        path: &Path,
        size: u64,
    ) -> Result<StoredObjectId, UploadError> {
        let io_error = |e: std::io::Error| UploadError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let mut file = tokio::fs::File::open(path).await.map_err(io_error)?;
        let mut offset: u64 = 0;
        // Highest committed offset seen and whether the chunk after it was already resent
        let mut high_water: u64 = 0;
        let mut resent = false;

        loop {
            let len = (size - offset).min(self.chunk_size as u64);
            let mut chunk = vec![0u8; len as usize];
            file.seek(SeekFrom::Start(offset)).await.map_err(io_error)?;
            file.read_exact(&mut chunk).await.map_err(io_error)?;

            let content_range = if size == 0 {
                "bytes */0".to_string()
            } else {
                format!("bytes {}-{}/{}", offset, offset + len - 1, size)
            };

            let response = self
                .client
                .put(session_uri)
                .bearer_auth(token)
                .header(CONTENT_RANGE, content_range)
                .body(chunk)
                .send()
                .await
                .map_err(|e| UploadError::Transport(format!("chunk upload failed: {e}")))?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => {
                    let created: CreatedFile = response.json().await.map_err(|e| {
                        UploadError::Transport(format!("malformed upload response: {e}"))
                    })?;
                    return created
                        .id
                        .filter(|id| !id.is_empty())
                        .map(StoredObjectId)
                        .ok_or(UploadError::MissingObjectId);
                }
                StatusCode::PERMANENT_REDIRECT => {
                    // A 308 without Range means nothing was stored yet
                    let committed = committed_bytes(response.headers());
                    let stalled = committed >= size || (committed <= high_water && resent);
                    if stalled {
                        return Err(UploadError::Rejected {
                            status: 308,
                            body: format!(
                                "upload stalled: server committed {committed} of {size} bytes"
                            ),
                        });
                    }
                    if committed > high_water {
                        high_water = committed;
                        resent = false;
                        tracing::trace!(committed, size, "upload chunk accepted");
                    } else {
                        resent = true;
                        tracing::debug!(committed, offset, size, "no upload progress, resending");
                    }
                    offset = committed;
                }
                _ => return Err(rejected(response).await),
            }
        }
    }
}

#[async_trait]
impl StorageBackend for DriveBackend {
    fn name(&self) -> &str {
        "google-drive"
    }

    async fn upload(
        &self,
        path: &Path,
        display_name: &str,
        container: &str,
    ) -> Result<StoredObjectId, UploadError> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| UploadError::Io {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .len();

        let token = self.tokens.access_token().await?;
        let session_uri = self
            .open_session(&token, display_name, container, size)
            .await?;

        tracing::debug!(
            path = %path.display(),
            size,
            container = %container,
            "Drive upload session opened"
        );

        self.send_chunks(&token, &session_uri, path, size).await
    }
}

/// Number of bytes the server has committed, from a `Range: bytes=0-N` header
fn committed_bytes(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
        .and_then(|v| v.split_once('-'))
        .and_then(|(_, end)| end.trim().parse::<u64>().ok())
        .map(|end| end + 1)
        .unwrap_or(0)
}

async fn rejected(response: reqwest::Response) -> UploadError {
    let status = response.status().as_u16();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("json"));
    let text = response.text().await.unwrap_or_default();

    // Drive wraps errors as {"error": {"message": ...}}; prefer the message
    let body = if is_json {
        serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(text)
    } else {
        text
    };

    UploadError::Rejected {
        status,
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}
