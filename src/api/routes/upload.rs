//! Job submission handler.

use crate::api::AppState;
use crate::error::{ApiResponse, Error};
use crate::types::JobRequest;
use axum::{body::Bytes, extract::State};

/// POST /gdrive-upload - Relay a remote file into a Drive folder
///
/// The body is parsed leniently: anything that is not a JSON object carrying
/// all five fields as non-empty strings is a 400. On success the reply is
/// sent before the file is fetched; the outcome arrives later at `webhook_url`.
#[utoipa::path(
    post,
    path = "/gdrive-upload",
    tag = "relay",
    request_body = JobRequest,
    responses(
        (status = 202, description = "Job accepted", body = ApiResponse),
        (status = 400, description = "Missing or invalid parameters", body = ApiResponse),
        (status = 401, description = "Missing or wrong X-API-Key", body = ApiResponse),
        (status = 503, description = "All job slots busy or shutting down", body = ApiResponse)
    ),
    security(("api_key" = []))
)]
pub async fn upload_file(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ApiResponse, Error> {
    let value: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| Error::MissingParameter)?;
    let request = JobRequest::from_value(&value)?;

    let id = state.relay.submit(request)?;
    tracing::debug!(job_id = %id, "acknowledged upload request");

    Ok(ApiResponse::processing())
}
