//! HTTP API handlers: exposes the topology, selection and event log as JSON.

pub mod log;
pub mod nodes;
pub mod select;
pub mod services;
pub mod status;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use dweb_core::config::SelectionConfig;
use dweb_core::NodeId;
use dweb_services::{EventLog, SelectError, Topology, TopologyError};

#[derive(Clone)]
pub struct ApiState {
    pub topology: Topology,
    pub event_log: Arc<EventLog>,
    pub selection: SelectionConfig,
    /// Parent of every selection's cancellation token. Cancelled on shutdown.
    pub cancel: CancellationToken,
    /// Shutdown broadcast sender: signals graceful daemon shutdown.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

/// Error returned by every handler: an HTTP status, a stable machine code,
/// and a human-readable message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SelectError> for ApiError {
    fn from(e: SelectError) -> Self {
        let (status, code) = match &e {
            SelectError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            SelectError::NoMatch(_) => (StatusCode::NOT_FOUND, "no_match"),
            SelectError::Cancelled(_) => (StatusCode::GATEWAY_TIMEOUT, "cancelled"),
            SelectError::Strategy(_) => (StatusCode::INTERNAL_SERVER_ERROR, "strategy_fault"),
        };
        Self::new(status, code, e.to_string())
    }
}

impl From<TopologyError> for ApiError {
    fn from(e: TopologyError) -> Self {
        let (status, code) = match &e {
            TopologyError::RootExists(_) => (StatusCode::CONFLICT, "root_exists"),
            TopologyError::UnknownService(_) => (StatusCode::NOT_FOUND, "unknown_service"),
            TopologyError::UnknownNode(_) => (StatusCode::NOT_FOUND, "unknown_node"),
            TopologyError::DuplicateId(_) => (StatusCode::CONFLICT, "duplicate_id"),
            TopologyError::InvalidFee { .. } => (StatusCode::BAD_REQUEST, "invalid_fee"),
            TopologyError::ServiceMismatch { .. } => (StatusCode::BAD_REQUEST, "service_mismatch"),
        };
        Self::new(status, code, e.to_string())
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Parse a hex-encoded node id.
fn parse_node_id(raw: &str) -> Result<NodeId, ApiError> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ApiError::bad_request("node id must be hex"));
    }
    Ok(NodeId::from(raw))
}

pub async fn handle_not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

// Re-export handler functions for use in router setup.
pub use log::handle_log;
pub use nodes::{
    handle_node_endpoint, handle_node_get, handle_node_link, handle_node_remove,
    handle_node_status, handle_register,
};
pub use select::handle_select;
pub use services::{handle_create_service, handle_services};
pub use status::{handle_shutdown, handle_status};
