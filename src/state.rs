use crate::alerts::AlertEvent;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::metrics::MetricReading;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

// ── Messages OUT of the engine ──

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "metric_reading")]
    MetricReadingMsg(MetricReading),

    #[serde(rename = "alert")]
    AlertMsg(AlertEvent),

    #[serde(rename = "pass_completed")]
    PassCompleted {
        run_id: String,
        readings: usize,
        alerts: usize,
        alerts_firing: usize,
        positions_evaluated: usize,
        failed_positions: usize,
        completed_at: String,
    },
}

// ── DB Commands (sent to writer task via bounded channel) ──

#[derive(Debug)]
pub enum DbCommand {
    InsertReading(MetricReading),
    InsertAlert(AlertEvent),
}

// ── Latest pass snapshot for the read API (watch channel) ──

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PassSnapshot {
    pub run_id: String,
    pub completed_at: String,
    pub readings: Vec<MetricReading>,
    pub alerts: Vec<AlertEvent>,
    pub positions_evaluated: usize,
    pub failed_positions: usize,
}

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub passes_completed: AtomicU64,
    pub readings_written: AtomicU64,
    pub alerts_emitted: AtomicU64,
    pub alerts_firing: AtomicU64,
    pub errors_recovered: AtomicU64,
    pub ws_messages_sent: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            passes_completed: AtomicU64::new(0),
            readings_written: AtomicU64::new(0),
            alerts_emitted: AtomicU64::new(0),
            alerts_firing: AtomicU64::new(0),
            errors_recovered: AtomicU64::new(0),
            ws_messages_sent: AtomicU64::new(0),
        }
    }
}

// ── Application shared state (channels, not locks) ──

pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,

    // Engine -> Dashboard: latest pass (watch = single producer, multi consumer)
    pub snapshot_tx: watch::Sender<PassSnapshot>,
    pub snapshot_rx: watch::Receiver<PassSnapshot>,

    // Engine -> Dashboard: event stream (broadcast for WS clients)
    pub ws_tx: broadcast::Sender<WsMessage>,

    // Engine -> DB Writer: bounded command channel
    pub db_tx: mpsc::Sender<DbCommand>,

    // Lock-free performance counters
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool, db_tx: mpsc::Sender<DbCommand>) -> Arc<Self> {
        let (ws_tx, _) = broadcast::channel(2048);
        let (snapshot_tx, snapshot_rx) = watch::channel(PassSnapshot::default());

        Arc::new(Self {
            config,
            db,
            snapshot_tx,
            snapshot_rx,
            ws_tx,
            db_tx,
            counters: PerfCounters::new(),
        })
    }

    #[inline]
    pub fn broadcast(&self, msg: WsMessage) {
        self.counters.ws_messages_sent.fetch_add(1, Ordering::Relaxed);
        let _ = self.ws_tx.send(msg);
    }
}
