pub mod calculators;
pub mod classify;
pub mod engine;

/// Entity key under which vault-wide readings are recorded.
pub const VAULT_ENTITY_KEY: &str = "vault";

/// Default band around a target inside which a miss is a warning, not critical.
pub const DEFAULT_WARNING_BAND: f64 = 0.10;

/// Yield efficiency is always measured against 100%.
pub const YIELD_EFFICIENCY_TARGET: f64 = 100.0;

/// Which direction of a metric is "good".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Ok,
    Warning,
    Critical,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The vault metric catalog. One reading per metric per evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    NetApy,
    Alpha,
    SharpeRatio,
    MaxDrawdown,
    YieldEfficiency,
    HarvestFrequency,
    GasEfficiency,
    SlippageControl,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetApy => "net_apy",
            Self::Alpha => "alpha",
            Self::SharpeRatio => "sharpe_ratio",
            Self::MaxDrawdown => "max_drawdown",
            Self::YieldEfficiency => "yield_efficiency",
            Self::HarvestFrequency => "harvest_frequency",
            Self::GasEfficiency => "gas_efficiency",
            Self::SlippageControl => "slippage_control",
        }
    }

    pub const ALL: [MetricName; 8] = [
        Self::NetApy,
        Self::Alpha,
        Self::SharpeRatio,
        Self::MaxDrawdown,
        Self::YieldEfficiency,
        Self::HarvestFrequency,
        Self::GasEfficiency,
        Self::SlippageControl,
    ];
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A computed, timestamped value for one metric, together with the context
/// that was in force when it was computed. Append-only per run; "latest"
/// means most recent by creation order, not by business timestamp.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricReading {
    pub run_id: String,
    pub entity_key: String,
    pub metric: MetricName,
    pub current_value: Option<f64>,
    pub target: Option<f64>,
    pub benchmark: Option<f64>,
    pub vs_target: Option<f64>,
    pub vs_benchmark: Option<f64>,
    pub status: MetricStatus,
    pub trend: Trend,
    pub previous_value: Option<f64>,
    pub change_pct: Option<f64>,
    /// RFC 3339
    pub created_at: String,
}
