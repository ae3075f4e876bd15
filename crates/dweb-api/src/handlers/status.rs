//! /status and /daemon/shutdown handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use dweb_services::StrategyKind;

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub services: usize,
    pub nodes: usize,
    pub default_strategy: String,
    pub strategies: Vec<StrategyKind>,
    pub event_log: String,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        services: state.topology.services().len(),
        nodes: state.topology.len(),
        default_strategy: state.selection.default_strategy.clone(),
        strategies: StrategyKind::ALL.to_vec(),
        event_log: state.event_log.path().display().to_string(),
    })
}

// ── /daemon/shutdown ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub status: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    state.cancel.cancel();
    let _ = state.shutdown_tx.send(());
    Json(ShutdownResponse {
        status: "shutting_down".to_string(),
    })
}
