/// Typed observation records, populated by the external ingestion layer.
/// The engine never touches raw pool/subgraph API payloads -- ingestion
/// normalizes them into these shapes before they reach any calculation.
use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, Utc};

/// One venue/pool exposure at a point in time. Immutable once recorded.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PositionSnapshot {
    /// Opaque pool/position identifier assigned by ingestion
    pub entity_key: String,
    /// Implied APY as a decimal (0.08 = 8%)
    pub implied_apy: Option<f64>,
    /// USD value of our allocation
    pub value_usd: Option<f64>,
    pub tvl_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    /// Market price of the principal token
    pub price_usd: Option<f64>,
    /// Computed fair value of the principal token
    pub fair_value_usd: Option<f64>,
    /// Accrued, unharvested yield in USD
    pub accrued_yield_usd: Option<f64>,
    /// Prevailing gas price observed at snapshot time
    pub gas_price_gwei: Option<f64>,
    /// Maturity of the position, if it has one
    pub maturity_ts: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PositionSnapshot {
    /// Reject a snapshot whose recorded numbers are not representable.
    /// A failed position is isolated by the caller -- it contributes no
    /// readings or alerts, the rest of the batch continues.
    pub fn validate(&self) -> EngineResult<()> {
        if self.entity_key.is_empty() {
            return Err(EngineError::MalformedPosition {
                key: "<empty>".into(),
                reason: "missing entity key".into(),
            });
        }
        let fields = [
            ("implied_apy", self.implied_apy),
            ("value_usd", self.value_usd),
            ("tvl_usd", self.tvl_usd),
            ("liquidity_usd", self.liquidity_usd),
            ("price_usd", self.price_usd),
            ("fair_value_usd", self.fair_value_usd),
            ("accrued_yield_usd", self.accrued_yield_usd),
            ("gas_price_gwei", self.gas_price_gwei),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(EngineError::MalformedPosition {
                        key: self.entity_key.clone(),
                        reason: format!("non-finite {name}"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// (timestamp, net asset value) for the whole vault.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct NavPoint {
    pub ts: DateTime<Utc>,
    pub nav_usd: f64,
}

/// A yield-claim action. Drives cadence and gas-efficiency metrics.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct HarvestEvent {
    pub ts: DateTime<Utc>,
    pub realized_usd: Option<f64>,
    pub gas_cost_usd: Option<f64>,
}

/// Quoted vs executed price for one trade.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct TradeExecution {
    pub quote_price: f64,
    pub execution_price: f64,
}

/// Everything one evaluation pass reads. Assembled by the store layer,
/// consumed by the pure computation layer.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ObservationBatch {
    pub positions: Vec<PositionSnapshot>,
    pub nav_history: Vec<NavPoint>,
    pub harvests: Vec<HarvestEvent>,
    pub trades: Vec<TradeExecution>,
}

impl Default for PositionSnapshot {
    fn default() -> Self {
        Self {
            entity_key: String::new(),
            implied_apy: None,
            value_usd: None,
            tvl_usd: None,
            liquidity_usd: None,
            price_usd: None,
            fair_value_usd: None,
            accrued_yield_usd: None,
            gas_price_gwei: None,
            maturity_ts: None,
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }
}
