use crate::config::AppConfig;
use crate::errors::{EngineError, EngineResult};
use crate::sequencer::{self, StoredReading};
use crate::settings::SettingsMap;
use crate::state::DbCommand;
use crate::vault::{HarvestEvent, NavPoint, ObservationBatch, PositionSnapshot, TradeExecution};
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub type DbPool = Arc<Mutex<Connection>>;

pub fn init_db(data_dir: &Path) -> EngineResult<DbPool> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| EngineError::Database(format!("create dir: {e}")))?;
    let db_path = data_dir.join("yieldscope.db");
    let conn = Connection::open(&db_path)?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA cache_size=-64000;")?;

    let schema = include_str!("../migrations/001_init.sql");
    conn.execute_batch(schema)?;

    tracing::info!("database initialized at {}", db_path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

/// Dedicated DB writer task. Reads commands from bounded channel, executes SQL.
/// This is the ONLY task that writes to the result tables.
pub async fn run_db_writer(db: DbPool, mut rx: mpsc::Receiver<DbCommand>) {
    tracing::info!("db writer task started");

    while let Some(cmd) = rx.recv().await {
        if let Err(e) = execute_command(&db, cmd) {
            tracing::error!("db write error: {e}");
        }
    }

    tracing::info!("db writer task shutting down");
}

fn execute_command(db: &DbPool, cmd: DbCommand) -> EngineResult<()> {
    let conn = db.lock().map_err(|e| EngineError::Database(format!("lock poisoned: {e}")))?;

    match cmd {
        DbCommand::InsertReading(r) => {
            conn.execute(
                "INSERT INTO metric_readings (run_id, entity_key, metric, current_value, target, benchmark, vs_target, vs_benchmark, status, trend, previous_value, change_pct, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    r.run_id,
                    r.entity_key,
                    r.metric.as_str(),
                    r.current_value,
                    r.target,
                    r.benchmark,
                    r.vs_target,
                    r.vs_benchmark,
                    r.status.as_str(),
                    r.trend.as_str(),
                    r.previous_value,
                    r.change_pct,
                    r.created_at,
                ],
            )?;
        }
        DbCommand::InsertAlert(a) => {
            conn.execute(
                "INSERT INTO alert_events (id, run_id, rule, position_key, condition_met, current_value, threshold, priority, action_required, auto_action, manual_review, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    a.id,
                    a.run_id,
                    a.rule.as_str(),
                    a.position_key,
                    a.condition_met,
                    a.current_value,
                    a.threshold,
                    a.priority.as_str(),
                    a.action_required.as_str(),
                    a.auto_action.as_str(),
                    a.manual_review.as_str(),
                    a.created_at,
                ],
            )?;
        }
    }
    Ok(())
}

// ── Observation reads (cold path -- once per evaluation pass) ──

/// Assemble everything one pass reads from the observation tables.
/// Positions are deduplicated to the most recent snapshot per entity key.
pub fn load_observation_batch(
    db: &DbPool,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> EngineResult<ObservationBatch> {
    let conn = db.lock().map_err(|e| EngineError::Database(format!("lock: {e}")))?;

    let position_since = (now - Duration::days(config.position_lookback_days)).to_rfc3339();
    let mut stmt = conn.prepare(
        "SELECT entity_key, implied_apy, value_usd, tvl_usd, liquidity_usd, price_usd, fair_value_usd, accrued_yield_usd, gas_price_gwei, maturity_ts, created_at
         FROM position_snapshots WHERE created_at >= ?1 ORDER BY id DESC",
    )?;
    let rows = stmt.query_map(rusqlite::params![position_since], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<f64>>(1)?,
            row.get::<_, Option<f64>>(2)?,
            row.get::<_, Option<f64>>(3)?,
            row.get::<_, Option<f64>>(4)?,
            row.get::<_, Option<f64>>(5)?,
            row.get::<_, Option<f64>>(6)?,
            row.get::<_, Option<f64>>(7)?,
            row.get::<_, Option<f64>>(8)?,
            row.get::<_, Option<String>>(9)?,
            row.get::<_, String>(10)?,
        ))
    })?;

    let all_positions: Vec<PositionSnapshot> = rows
        .filter_map(|r| r.ok())
        .filter_map(|(key, apy, value, tvl, liq, price, fair, accrued, gas, maturity, created)| {
            Some(PositionSnapshot {
                entity_key: key,
                implied_apy: apy,
                value_usd: value,
                tvl_usd: tvl,
                liquidity_usd: liq,
                price_usd: price,
                fair_value_usd: fair,
                accrued_yield_usd: accrued,
                gas_price_gwei: gas,
                maturity_ts: maturity.as_deref().and_then(parse_ts),
                created_at: parse_ts(&created)?,
            })
        })
        .collect();

    // rows are newest-first; first snapshot seen per key wins
    let positions = sequencer::latest_per_key(&all_positions, |p| p.entity_key.clone())
        .into_iter()
        .cloned()
        .collect();

    let nav_since = (now - Duration::days(config.nav_lookback_days)).to_rfc3339();
    let mut stmt = conn.prepare("SELECT ts, nav_usd FROM nav_points WHERE ts >= ?1 ORDER BY ts ASC")?;
    let rows = stmt.query_map(rusqlite::params![nav_since], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?;
    let nav_history = rows
        .filter_map(|r| r.ok())
        .filter_map(|(ts, nav_usd)| Some(NavPoint { ts: parse_ts(&ts)?, nav_usd }))
        .collect();

    let harvest_since = (now - Duration::days(config.harvest_lookback_days)).to_rfc3339();
    let mut stmt = conn.prepare(
        "SELECT ts, realized_usd, gas_cost_usd FROM harvest_events WHERE ts >= ?1 ORDER BY ts ASC",
    )?;
    let rows = stmt.query_map(rusqlite::params![harvest_since], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<f64>>(1)?,
            row.get::<_, Option<f64>>(2)?,
        ))
    })?;
    let harvests = rows
        .filter_map(|r| r.ok())
        .filter_map(|(ts, realized_usd, gas_cost_usd)| {
            Some(HarvestEvent { ts: parse_ts(&ts)?, realized_usd, gas_cost_usd })
        })
        .collect();

    let trade_since = (now - Duration::days(config.trade_lookback_days)).to_rfc3339();
    let mut stmt = conn.prepare(
        "SELECT quote_price, execution_price FROM trade_executions WHERE ts >= ?1 ORDER BY ts ASC",
    )?;
    let rows = stmt.query_map(rusqlite::params![trade_since], |row| {
        Ok(TradeExecution {
            quote_price: row.get(0)?,
            execution_price: row.get(1)?,
        })
    })?;
    let trades = rows.filter_map(|r| r.ok()).collect();

    Ok(ObservationBatch { positions, nav_history, harvests, trades })
}

pub fn load_settings(db: &DbPool) -> EngineResult<SettingsMap> {
    let conn = db.lock().map_err(|e| EngineError::Database(format!("lock: {e}")))?;
    let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
    })?;

    let mut entries = HashMap::new();
    for (key, value) in rows.filter_map(|r| r.ok()) {
        if let Some(value) = value {
            entries.insert(key, value);
        }
    }
    Ok(SettingsMap::new(entries))
}

/// Stored readings newest-first, for previous-value and trend lookups.
pub fn load_reading_history(db: &DbPool, limit: usize) -> EngineResult<Vec<StoredReading>> {
    let conn = db.lock().map_err(|e| EngineError::Database(format!("lock: {e}")))?;
    let mut stmt = conn.prepare(
        "SELECT run_id, entity_key, metric, current_value FROM metric_readings ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(rusqlite::params![limit as i64], |row| {
        Ok(StoredReading {
            run_id: row.get(0)?,
            entity_key: row.get(1)?,
            metric: row.get(2)?,
            value: row.get(3)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

// ── Query helpers (for server REST reads -- cold path only) ──

pub fn get_recent_readings(db: &DbPool, metric: Option<&str>, limit: usize) -> EngineResult<Vec<ReadingRow>> {
    let conn = db.lock().map_err(|e| EngineError::Database(format!("lock: {e}")))?;
    let (sql, params): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match metric {
        Some(name) => (
            "SELECT run_id, entity_key, metric, current_value, target, benchmark, vs_target, vs_benchmark, status, trend, previous_value, change_pct, created_at FROM metric_readings WHERE metric = ?1 ORDER BY id DESC LIMIT ?2".into(),
            vec![Box::new(name.to_string()), Box::new(limit as i64)],
        ),
        None => (
            "SELECT run_id, entity_key, metric, current_value, target, benchmark, vs_target, vs_benchmark, status, trend, previous_value, change_pct, created_at FROM metric_readings ORDER BY id DESC LIMIT ?1".into(),
            vec![Box::new(limit as i64)],
        ),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
        Ok(ReadingRow {
            run_id: row.get(0)?,
            entity_key: row.get(1)?,
            metric: row.get(2)?,
            current_value: row.get(3)?,
            target: row.get(4)?,
            benchmark: row.get(5)?,
            vs_target: row.get(6)?,
            vs_benchmark: row.get(7)?,
            status: row.get(8)?,
            trend: row.get(9)?,
            previous_value: row.get(10)?,
            change_pct: row.get(11)?,
            created_at: row.get(12)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_recent_alerts(db: &DbPool, rule: Option<&str>, limit: usize) -> EngineResult<Vec<AlertRow>> {
    let conn = db.lock().map_err(|e| EngineError::Database(format!("lock: {e}")))?;
    let (sql, params): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match rule {
        Some(name) => (
            "SELECT id, run_id, rule, position_key, condition_met, current_value, threshold, priority, action_required, auto_action, manual_review, created_at FROM alert_events WHERE rule = ?1 ORDER BY rowid DESC LIMIT ?2".into(),
            vec![Box::new(name.to_string()), Box::new(limit as i64)],
        ),
        None => (
            "SELECT id, run_id, rule, position_key, condition_met, current_value, threshold, priority, action_required, auto_action, manual_review, created_at FROM alert_events ORDER BY rowid DESC LIMIT ?1".into(),
            vec![Box::new(limit as i64)],
        ),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
        Ok(AlertRow {
            id: row.get(0)?,
            run_id: row.get(1)?,
            rule: row.get(2)?,
            position_key: row.get(3)?,
            condition_met: row.get(4)?,
            current_value: row.get(5)?,
            threshold: row.get(6)?,
            priority: row.get(7)?,
            action_required: row.get(8)?,
            auto_action: row.get(9)?,
            manual_review: row.get(10)?,
            created_at: row.get(11)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Latest alert per (rule, position) -- the query-time "current state" view
/// over the append-only history.
pub fn get_alert_state(db: &DbPool, limit: usize) -> EngineResult<Vec<AlertRow>> {
    let history = get_recent_alerts(db, None, limit)?;
    let latest = sequencer::latest_per_key(&history, |a| (a.rule.clone(), a.position_key.clone()));
    Ok(latest.into_iter().cloned().collect())
}

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ── Row types ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct ReadingRow {
    pub run_id: String,
    pub entity_key: String,
    pub metric: String,
    pub current_value: Option<f64>,
    pub target: Option<f64>,
    pub benchmark: Option<f64>,
    pub vs_target: Option<f64>,
    pub vs_benchmark: Option<f64>,
    pub status: String,
    pub trend: String,
    pub previous_value: Option<f64>,
    pub change_pct: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertRow {
    pub id: String,
    pub run_id: String,
    pub rule: String,
    pub position_key: String,
    pub condition_met: bool,
    pub current_value: Option<f64>,
    pub threshold: Option<f64>,
    pub priority: String,
    pub action_required: String,
    pub auto_action: String,
    pub manual_review: String,
    pub created_at: String,
}
