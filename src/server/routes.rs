use crate::db;
use crate::state::{AppState, PassSnapshot};
use axum::extract::{Query, State};
use axum::response::Json;
use std::sync::Arc;

#[derive(serde::Deserialize)]
pub struct ReadingsQuery {
    pub metric: Option<String>,
    pub limit: Option<usize>,
}

#[derive(serde::Deserialize)]
pub struct AlertsQuery {
    pub rule: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/state -- latest evaluation pass (from watch channel, no lock)
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<PassSnapshot> {
    let snapshot = state.snapshot_rx.borrow().clone();
    Json(snapshot)
}

/// GET /api/readings -- recent metric readings from DB (cold path)
pub async fn get_readings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReadingsQuery>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(50).min(500);
    match db::get_recent_readings(&state.db, params.metric.as_deref(), limit) {
        Ok(readings) => Json(serde_json::json!({ "readings": readings })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// GET /api/alerts -- recent alert events from DB (cold path)
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertsQuery>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(100).min(1000);
    match db::get_recent_alerts(&state.db, params.rule.as_deref(), limit) {
        Ok(alerts) => Json(serde_json::json!({ "alerts": alerts })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// GET /api/alerts/state -- latest alert per (rule, position)
pub async fn get_alert_state(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match db::get_alert_state(&state.db, 2_000) {
        Ok(alerts) => Json(serde_json::json!({ "alerts": alerts })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    Json(serde_json::json!({
        "passes_completed": state.counters.passes_completed.load(Relaxed),
        "readings_written": state.counters.readings_written.load(Relaxed),
        "alerts_emitted": state.counters.alerts_emitted.load(Relaxed),
        "alerts_firing": state.counters.alerts_firing.load(Relaxed),
        "errors_recovered": state.counters.errors_recovered.load(Relaxed),
        "ws_messages_sent": state.counters.ws_messages_sent.load(Relaxed),
    }))
}
