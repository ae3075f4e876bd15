//! /nodes handlers: registration and monitoring writes.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use dweb_core::{NodeInfo, NodeStatus};
use dweb_services::ServiceNode;

use super::{parse_node_id, ApiError, ApiState};

// ── /nodes (POST) ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default)]
    pub owner_key: String,
    pub service: String,
    pub endpoint: String,
    /// Node this one discovered the service through. Defaults to the root.
    pub parent: Option<String>,
    #[serde(default)]
    pub status: NodeStatus,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: String,
    pub parent: String,
}

pub async fn handle_register(
    State(state): State<ApiState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let parent = match req.parent.as_deref() {
        Some(raw) => parse_node_id(raw)?,
        None => state.topology.lookup(&req.service)?.id().clone(),
    };

    let node = ServiceNode::register(&req.name, req.owner_key, req.service, req.endpoint)
        .with_status(req.status);
    let node = state.topology.insert_child(&parent, node)?;

    Ok(Json(RegisterResponse {
        id: node.id().to_string(),
        parent: parent.to_string(),
    }))
}

// ── /nodes/{id} (GET, DELETE) ─────────────────────────────────────────────────

pub async fn handle_node_get(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<NodeInfo>, ApiError> {
    let id = parse_node_id(&id)?;
    let node = state.topology.get(&id).ok_or_else(|| {
        ApiError::from(dweb_services::TopologyError::UnknownNode(id.clone()))
    })?;
    Ok(Json(node.info()))
}

#[derive(Serialize)]
pub struct RemoveResponse {
    pub id: String,
    pub service: String,
}

pub async fn handle_node_remove(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<RemoveResponse>, ApiError> {
    let id = parse_node_id(&id)?;
    let node = state.topology.remove(&id)?;
    Ok(Json(RemoveResponse {
        id: id.to_string(),
        service: node.service().to_string(),
    }))
}

// ── /nodes/{id}/link (POST) ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LinkRequest {
    pub child: String,
}

pub async fn handle_node_link(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<LinkRequest>,
) -> Result<Json<NodeInfo>, ApiError> {
    let parent = parse_node_id(&id)?;
    let child = parse_node_id(&req.child)?;
    state.topology.link(&parent, &child)?;
    handle_node_get(State(state), Path(id)).await
}

// ── /nodes/{id}/status (PUT) ──────────────────────────────────────────────────

pub async fn handle_node_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(status): Json<NodeStatus>,
) -> Result<Json<NodeStatus>, ApiError> {
    let id = parse_node_id(&id)?;
    state.topology.update_status(&id, status)?;
    Ok(Json(status))
}

// ── /nodes/{id}/endpoint (PUT) ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct EndpointRequest {
    pub endpoint: String,
}

pub async fn handle_node_endpoint(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<EndpointRequest>,
) -> Result<Json<NodeInfo>, ApiError> {
    let node_id = parse_node_id(&id)?;
    state.topology.update_endpoint(&node_id, &req.endpoint)?;
    handle_node_get(State(state), Path(id)).await
}
