//! Streaming download of a source file into the staging area.

use crate::error::FetchError;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Streams remote files to local paths without buffering whole bodies
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl Fetcher {
    /// Create a fetcher sharing the given HTTP client
    pub fn new(client: reqwest::Client, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }

    /// Stream `url` into a new file at `path`, returning the bytes written
    ///
    /// The file is only created once the server has answered with a success
    /// status. After a mid-stream failure a partial file may remain; removing it
    /// is the caller's job.
    pub async fn fetch(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.to_string(),
            });
        }

        let write_error = |e: std::io::Error| FetchError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let file = tokio::fs::File::create(path).await.map_err(write_error)?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(url, &e))?;
            writer.write_all(&chunk).await.map_err(write_error)?;
            written += chunk.len() as u64;
        }

        writer.flush().await.map_err(write_error)?;
        writer.into_inner().sync_all().await.map_err(write_error)?;

        tracing::debug!(url = %url, path = %path.display(), bytes = written, "fetched source file");
        Ok(written)
    }
}

fn transport_error(url: &str, e: &reqwest::Error) -> FetchError {
    let reason = if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    };
    FetchError::Transport {
        url: url.to_string(),
        reason,
    }
}
