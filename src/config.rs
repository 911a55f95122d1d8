use crate::errors::{EngineError, EngineResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub evaluation_interval_secs: u64,
    pub server_port: u16,
    /// Lookback window for NAV history (days)
    pub nav_lookback_days: i64,
    /// Lookback window for harvest logs (days)
    pub harvest_lookback_days: i64,
    /// Lookback window for trade execution logs (days)
    pub trade_lookback_days: i64,
    /// How far back a position snapshot may be and still count as current (days)
    pub position_lookback_days: i64,
    /// Warning band around a metric target (fraction, e.g. 0.10)
    pub warning_band: f64,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let evaluation_interval_secs = env_var_or("EVALUATION_INTERVAL_SECS", "900")
            .parse::<u64>()
            .map_err(|e| EngineError::Config(format!("EVALUATION_INTERVAL_SECS: {e}")))?;

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("SERVER_PORT: {e}")))?;

        let nav_lookback_days = env_var_or("NAV_LOOKBACK_DAYS", "60")
            .parse::<i64>()
            .map_err(|e| EngineError::Config(format!("NAV_LOOKBACK_DAYS: {e}")))?;

        let harvest_lookback_days = env_var_or("HARVEST_LOOKBACK_DAYS", "30")
            .parse::<i64>()
            .map_err(|e| EngineError::Config(format!("HARVEST_LOOKBACK_DAYS: {e}")))?;

        let trade_lookback_days = env_var_or("TRADE_LOOKBACK_DAYS", "30")
            .parse::<i64>()
            .map_err(|e| EngineError::Config(format!("TRADE_LOOKBACK_DAYS: {e}")))?;

        let position_lookback_days = env_var_or("POSITION_LOOKBACK_DAYS", "2")
            .parse::<i64>()
            .map_err(|e| EngineError::Config(format!("POSITION_LOOKBACK_DAYS: {e}")))?;

        let warning_band = env_var_or("WARNING_BAND", "0.10")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("WARNING_BAND: {e}")))?;

        Ok(Self {
            data_dir: PathBuf::from(env_var_or("DATA_DIR", "data")),
            evaluation_interval_secs,
            server_port,
            nav_lookback_days,
            harvest_lookback_days,
            trade_lookback_days,
            position_lookback_days,
            warning_band,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
