//! /select/{service}: pick a provider with a named strategy.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use dweb_core::NodeInfo;
use dweb_services::{EventLog, SearchControl, SelectError, Selection, StrategyKind};

use super::{ApiError, ApiState};

#[derive(Deserialize)]
pub struct SelectQuery {
    pub strategy: Option<String>,
}

#[derive(Serialize)]
pub struct SelectResponse {
    pub service: String,
    pub strategy: StrategyKind,
    pub node: NodeInfo,
    pub evaluations: usize,
}

pub async fn handle_select(
    State(state): State<ApiState>,
    Path(service): Path<String>,
    Query(query): Query<SelectQuery>,
) -> Result<Json<SelectResponse>, ApiError> {
    let name = query
        .strategy
        .unwrap_or_else(|| state.selection.default_strategy.clone());
    let kind: StrategyKind = name
        .parse()
        .map_err(|e: dweb_services::strategy::UnknownStrategy| ApiError::bad_request(e.to_string()))?;

    let control = SearchControl::unbounded()
        .with_cancel(state.cancel.child_token())
        .with_timeout(Duration::from_millis(state.selection.timeout_ms));
    let topology = state.topology.clone();
    let event_log = state.event_log.clone();
    let weights = state.selection.weights;
    let target = service.clone();

    // The search and the log write are both blocking; keep them off the
    // async workers.
    let result = tokio::task::spawn_blocking(move || {
        let mut strategy = kind.build(weights);
        let result = topology.select(&target, &mut *strategy, &control);
        record_outcome(&event_log, &target, kind, &result);
        result
    })
    .await
    .map_err(|e| ApiError::internal(format!("selection task failed: {e}")))?;

    let selection = result?;

    Ok(Json(SelectResponse {
        service,
        strategy: kind,
        node: selection.node.info(),
        evaluations: selection.evaluations,
    }))
}

fn record_outcome(
    log: &EventLog,
    service: &str,
    kind: StrategyKind,
    result: &Result<Selection, SelectError>,
) {
    let mut fields = Map::new();
    fields.insert("service".into(), Value::from(service));
    fields.insert("strategy".into(), Value::from(kind.as_str()));

    let outcome = match result {
        Ok(selection) => {
            fields.insert("node".into(), Value::from(selection.node.id().as_str()));
            fields.insert("evaluations".into(), Value::from(selection.evaluations));
            "selected"
        }
        Err(SelectError::NotFound(_)) => "not_found",
        Err(SelectError::NoMatch(_)) => "no_match",
        Err(SelectError::Cancelled(_)) => "cancelled",
        Err(SelectError::Strategy(e)) => {
            fields.insert("error".into(), Value::from(e.to_string()));
            "strategy_fault"
        }
    };
    fields.insert("outcome".into(), Value::from(outcome));

    if let Err(e) = log.record_fields("selection", fields) {
        tracing::warn!(error = %e, service, "failed to record selection outcome");
    }
}
