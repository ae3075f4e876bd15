//! /services handlers: registered service types.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};

// ── /services (GET) ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ServicesResponse {
    pub services: Vec<ServiceInfo>,
}

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub providers: usize,
}

pub async fn handle_services(State(state): State<ApiState>) -> Json<ServicesResponse> {
    let services = state
        .topology
        .services()
        .into_iter()
        .map(|(service, providers)| ServiceInfo { service, providers })
        .collect();

    Json(ServicesResponse { services })
}

// ── /services (POST) ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub service: String,
}

#[derive(Serialize)]
pub struct CreateServiceResponse {
    pub service: String,
    pub root: String,
}

pub async fn handle_create_service(
    State(state): State<ApiState>,
    Json(req): Json<CreateServiceRequest>,
) -> Result<Json<CreateServiceResponse>, ApiError> {
    if req.service.trim().is_empty() {
        return Err(ApiError::bad_request("service name must not be empty"));
    }
    let root = state.topology.create_root(&req.service)?;

    Ok(Json(CreateServiceResponse {
        service: req.service,
        root: root.id().to_string(),
    }))
}
