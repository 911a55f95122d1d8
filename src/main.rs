mod alerts;
mod config;
mod db;
mod errors;
mod metrics;
mod sequencer;
mod server;
mod settings;
mod state;
mod vault;

use crate::errors::EngineResult;
use crate::metrics::engine::{self, PassInput};
use crate::settings::VaultSettings;
use crate::state::{AppState, DbCommand, PassSnapshot, WsMessage};
use portable_atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

/// How many stored readings to scan for previous-value lookups. Eight
/// metrics per pass, so this covers weeks of history.
const READING_HISTORY_LIMIT: usize = 512;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("yieldscope engine starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Init database
    let db_pool = match db::init_db(&cfg.data_dir) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("database init error: {e}");
            std::process::exit(1);
        }
    };

    // Bounded command channel into the writer task
    let (db_tx, db_rx) = mpsc::channel::<DbCommand>(1024);

    // Shared state
    let app_state = AppState::new(cfg.clone(), db_pool.clone(), db_tx.clone());

    // ── Spawn tasks ──

    // 1. DB writer task (dedicated, owns all writes)
    let db_pool_writer = db_pool.clone();
    tokio::spawn(async move {
        db::run_db_writer(db_pool_writer, db_rx).await;
    });

    // 2. Evaluation loop (interval-driven)
    let engine_state = app_state.clone();
    tokio::spawn(async move {
        run_evaluation_loop(engine_state).await;
    });

    // 3. Axum HTTP + WS server
    let server_state = app_state.clone();
    let port = cfg.server_port;

    let app = axum::Router::new()
        .route("/api/state", axum::routing::get(server::routes::get_state))
        .route("/api/readings", axum::routing::get(server::routes::get_readings))
        .route("/api/alerts", axum::routing::get(server::routes::get_alerts))
        .route("/api/alerts/state", axum::routing::get(server::routes::get_alert_state))
        .route("/api/counters", axum::routing::get(server::routes::get_counters))
        .route("/ws", axum::routing::get(server::ws::ws_handler))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(server_state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}

/// Interval-driven evaluation loop. Each tick runs one full pass; a failed
/// pass (store unavailable, etc.) is logged and the loop waits for the next
/// tick -- retries belong to the ingestion layer, not here.
async fn run_evaluation_loop(state: Arc<AppState>) {
    tracing::info!(
        interval_secs = state.config.evaluation_interval_secs,
        "evaluation loop started"
    );

    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
        state.config.evaluation_interval_secs,
    ));

    loop {
        interval.tick().await;

        match execute_pass(&state).await {
            Ok(snapshot) => {
                state.counters.passes_completed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    run_id = %snapshot.run_id,
                    readings = snapshot.readings.len(),
                    alerts = snapshot.alerts.len(),
                    positions = snapshot.positions_evaluated,
                    failed_positions = snapshot.failed_positions,
                    "evaluation pass complete"
                );
            }
            Err(e) => {
                state.counters.errors_recovered.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %e, "evaluation pass failed, waiting for next tick");
            }
        }
    }
}

/// One evaluation pass: read observations, settings and history, run the
/// pure computation, persist and broadcast the results.
async fn execute_pass(state: &Arc<AppState>) -> EngineResult<PassSnapshot> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now();

    // Cold reads
    let batch = db::load_observation_batch(&state.db, &state.config, now)?;
    let settings_map = db::load_settings(&state.db)?;
    let vault_settings = VaultSettings::from_map(&settings_map);
    let history = db::load_reading_history(&state.db, READING_HISTORY_LIMIT)?;

    // Pure computation (synchronous, deterministic)
    let readings = engine::run_pass(&PassInput {
        run_id: &run_id,
        now,
        batch: &batch,
        settings: &vault_settings,
        history: &history,
        warning_band: state.config.warning_band,
        harvest_lookback_days: state.config.harvest_lookback_days,
    });

    let alert_outcome =
        alerts::evaluator::evaluate_positions(&batch.positions, &settings_map, &run_id, now);
    if alert_outcome.failed_positions > 0 {
        state
            .counters
            .errors_recovered
            .fetch_add(alert_outcome.failed_positions as u64, Ordering::Relaxed);
    }

    // Persist + broadcast
    for reading in &readings {
        state
            .db_tx
            .send(DbCommand::InsertReading(reading.clone()))
            .await
            .map_err(|e| errors::EngineError::ChannelClosed(e.to_string()))?;
        state.counters.readings_written.fetch_add(1, Ordering::Relaxed);
        state.broadcast(WsMessage::MetricReadingMsg(reading.clone()));
    }

    let mut alerts_firing = 0usize;
    for alert in &alert_outcome.events {
        state
            .db_tx
            .send(DbCommand::InsertAlert(alert.clone()))
            .await
            .map_err(|e| errors::EngineError::ChannelClosed(e.to_string()))?;
        state.counters.alerts_emitted.fetch_add(1, Ordering::Relaxed);

        if alert.condition_met {
            alerts_firing += 1;
            state.counters.alerts_firing.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                rule = %alert.rule,
                position = %alert.position_key,
                value = ?alert.current_value,
                threshold = ?alert.threshold,
                priority = alert.priority.as_str(),
                "alert condition met"
            );
            state.broadcast(WsMessage::AlertMsg(alert.clone()));
        }
    }

    let snapshot = PassSnapshot {
        run_id: run_id.clone(),
        completed_at: now.to_rfc3339(),
        readings,
        alerts: alert_outcome.events,
        positions_evaluated: batch.positions.len(),
        failed_positions: alert_outcome.failed_positions,
    };

    state.broadcast(WsMessage::PassCompleted {
        run_id,
        readings: snapshot.readings.len(),
        alerts: snapshot.alerts.len(),
        alerts_firing,
        positions_evaluated: snapshot.positions_evaluated,
        failed_positions: snapshot.failed_positions,
        completed_at: snapshot.completed_at.clone(),
    });

    let _ = state.snapshot_tx.send(snapshot.clone());

    Ok(snapshot)
}
