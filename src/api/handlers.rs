use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::finding::Finding;
use crate::pipeline::DetectorStats;

use super::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<Vec<DetectorStats>> {
    let stats = state
        .detectors
        .iter()
        .map(|detector| detector.stats())
        .collect();
    Json(stats)
}

pub async fn recent_findings(State(state): State<Arc<AppState>>) -> Json<Vec<Finding>> {
    Json(state.findings.snapshot().await)
}
