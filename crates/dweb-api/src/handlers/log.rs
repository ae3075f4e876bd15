//! /log: event ingestion from remote nodes.

use axum::extract::State;
use axum::http::StatusCode;
use bytes::Bytes;

use super::{ApiError, ApiState};

/// One request body = one record. Empty bodies are rejected.
pub async fn handle_log(State(state): State<ApiState>, body: Bytes) -> Result<StatusCode, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("empty event"));
    }
    let message = String::from_utf8_lossy(&body).into_owned();

    // A write may rotate and compress backups; keep that off the workers.
    let log = state.event_log.clone();
    tokio::task::spawn_blocking(move || log.record(&message))
        .await
        .map_err(|e| ApiError::internal(format!("event task failed: {e}")))?
        .map_err(|e| {
            tracing::warn!(error = %e, "failed to record event");
            ApiError::internal(e.to_string())
        })?;

    Ok(StatusCode::OK)
}
