/// Threshold and target resolution over a flat key -> numeric-string map.
///
/// The settings store is externally owned. A missing key always resolves to
/// None ("no threshold"), never to zero and never to an error -- downstream
/// layers treat None as "undecidable" (WARNING status, non-firing alert).
use std::collections::HashMap;

pub mod keys {
    pub const APY_TARGET: &str = "vault.apy.target";
    pub const APY_BENCHMARK: &str = "vault.apy.benchmark";
    /// Alpha target is stored in basis points
    pub const ALPHA_TARGET_BPS: &str = "vault.alpha.target_bps";
    pub const RISK_FREE_RATE: &str = "riskfree.rate";
    pub const SHARPE_TARGET: &str = "vault.sharpe.target";
    pub const SHARPE_BENCHMARK: &str = "vault.sharpe.benchmark";
    pub const MAXDD_LIMIT: &str = "vault.maxdd.limit";
    pub const MAXDD_BENCHMARK: &str = "vault.maxdd.benchmark";
    pub const YIELD_BENCHMARK_PCT: &str = "vault.yield.benchmark_pct";
    pub const HARVEST_INTERVAL_TARGET_DAYS: &str = "harvest.interval.target_days";
    pub const GAS_EFFICIENCY_MIN_RATIO: &str = "gas.efficiency.min_ratio";
    pub const SLIPPAGE_MAX_PCT: &str = "slippage.max_pct";

    pub const ALERT_MISPRICING: &str = "alert.mispricing.threshold";
    pub const ALERT_HARVEST: &str = "alert.harvest.threshold";
    pub const ALERT_LIQUIDITY: &str = "alert.liquidity.threshold";
    pub const ALERT_GAS_SPIKE: &str = "alert.gas_spike.threshold";
    pub const ALERT_MATURITY_DAYS: &str = "alert.maturity.threshold_days";
}

/// Raw settings as loaded from the store.
#[derive(Debug, Clone, Default)]
pub struct SettingsMap {
    entries: HashMap<String, String>,
}

impl SettingsMap {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Parse the value under `key` as a finite f64. Absent, empty, or
    /// unparseable values all resolve to None.
    pub fn numeric(&self, key: &str) -> Option<f64> {
        let raw = self.entries.get(key)?;
        let parsed = raw.trim().parse::<f64>().ok()?;
        parsed.is_finite().then_some(parsed)
    }
}

/// Typed view of every target/benchmark the metric catalog needs.
/// Each field is independently optional -- a partially configured store
/// degrades the affected metrics to WARNING, nothing more.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct VaultSettings {
    pub apy_target: Option<f64>,
    pub apy_benchmark: Option<f64>,
    pub alpha_target: Option<f64>,
    pub risk_free_rate: Option<f64>,
    pub sharpe_target: Option<f64>,
    pub sharpe_benchmark: Option<f64>,
    pub maxdd_limit: Option<f64>,
    pub maxdd_benchmark: Option<f64>,
    pub yield_benchmark_pct: Option<f64>,
    pub harvest_interval_target_days: Option<f64>,
    pub gas_efficiency_min_ratio: Option<f64>,
    pub slippage_max_pct: Option<f64>,
}

impl VaultSettings {
    pub fn from_map(map: &SettingsMap) -> Self {
        Self {
            apy_target: map.numeric(keys::APY_TARGET),
            apy_benchmark: map.numeric(keys::APY_BENCHMARK),
            // stored as basis points, used as a decimal
            alpha_target: map.numeric(keys::ALPHA_TARGET_BPS).map(|bps| bps / 10_000.0),
            risk_free_rate: map.numeric(keys::RISK_FREE_RATE),
            sharpe_target: map.numeric(keys::SHARPE_TARGET),
            sharpe_benchmark: map.numeric(keys::SHARPE_BENCHMARK),
            maxdd_limit: map.numeric(keys::MAXDD_LIMIT),
            maxdd_benchmark: map.numeric(keys::MAXDD_BENCHMARK),
            yield_benchmark_pct: map.numeric(keys::YIELD_BENCHMARK_PCT),
            harvest_interval_target_days: map.numeric(keys::HARVEST_INTERVAL_TARGET_DAYS),
            gas_efficiency_min_ratio: map.numeric(keys::GAS_EFFICIENCY_MIN_RATIO),
            slippage_max_pct: map.numeric(keys::SLIPPAGE_MAX_PCT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(pairs: &[(&str, &str)]) -> SettingsMap {
        SettingsMap::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_missing_key_is_none() {
        let map = map_of(&[]);
        assert_eq!(map.numeric(keys::APY_TARGET), None);
    }

    #[test]
    fn test_unparseable_value_is_none() {
        let map = map_of(&[(keys::APY_TARGET, "not a number"), (keys::SHARPE_TARGET, "")]);
        assert_eq!(map.numeric(keys::APY_TARGET), None);
        assert_eq!(map.numeric(keys::SHARPE_TARGET), None);
    }

    #[test]
    fn test_non_finite_value_is_none() {
        let map = map_of(&[(keys::APY_TARGET, "NaN"), (keys::SHARPE_TARGET, "inf")]);
        assert_eq!(map.numeric(keys::APY_TARGET), None);
        assert_eq!(map.numeric(keys::SHARPE_TARGET), None);
    }

    #[test]
    fn test_alpha_target_converts_bps_to_decimal() {
        let map = map_of(&[(keys::ALPHA_TARGET_BPS, "150")]);
        let settings = VaultSettings::from_map(&map);
        assert!((settings.alpha_target.unwrap() - 0.015).abs() < 1e-12);
    }

    #[test]
    fn test_partial_configuration() {
        let map = map_of(&[(keys::APY_TARGET, "0.08")]);
        let settings = VaultSettings::from_map(&map);
        assert_eq!(settings.apy_target, Some(0.08));
        assert_eq!(settings.apy_benchmark, None);
        assert_eq!(settings.risk_free_rate, None);
    }
}
