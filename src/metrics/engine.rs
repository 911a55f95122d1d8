/// One evaluation pass: observation batch + settings + stored history in,
/// metric readings out. Synchronous and deterministic -- given identical
/// inputs, every field except the timestamps is reproduced exactly.
use crate::metrics::{
    calculators, classify, MetricName, MetricReading, Polarity, VAULT_ENTITY_KEY,
    YIELD_EFFICIENCY_TARGET,
};
use crate::sequencer::{self, StoredReading};
use crate::settings::VaultSettings;
use crate::vault::ObservationBatch;
use chrono::{DateTime, Utc};

/// Everything a pass reads. History rows arrive most-recently-created first
/// and never include rows the current run wrote.
pub struct PassInput<'a> {
    pub run_id: &'a str,
    pub now: DateTime<Utc>,
    pub batch: &'a ObservationBatch,
    pub settings: &'a VaultSettings,
    pub history: &'a [StoredReading],
    pub warning_band: f64,
    /// Window the harvest/trade observations were collected over, used to
    /// pro-rate the yield target.
    pub harvest_lookback_days: i64,
}

struct MetricComputation {
    metric: MetricName,
    value: Option<f64>,
    target: Option<f64>,
    benchmark: Option<f64>,
    polarity: Polarity,
    /// Some metrics define their benchmark delta directly instead of via
    /// compute_delta (alpha reports net APY minus benchmark).
    vs_benchmark_override: Option<Option<f64>>,
}

/// Compute the full vault metric catalog for one pass.
pub fn run_pass(input: &PassInput) -> Vec<MetricReading> {
    let batch = input.batch;
    let settings = input.settings;

    let net_apy = calculators::weighted_net_apy(&batch.positions);
    let alpha = calculators::alpha(net_apy, settings.apy_benchmark);
    let returns = calculators::daily_returns(&batch.nav_history);
    let sharpe = calculators::sharpe_ratio(&returns, settings.risk_free_rate);
    let max_drawdown = calculators::max_drawdown(&batch.nav_history);

    let total_value_usd: f64 = batch
        .positions
        .iter()
        .filter_map(|p| p.value_usd)
        .filter(|v| v.is_finite() && *v > 0.0)
        .sum();
    let realized_usd: f64 = batch
        .harvests
        .iter()
        .filter_map(|h| h.realized_usd)
        .filter(|v| v.is_finite())
        .sum();
    let gas_cost_usd: f64 = batch
        .harvests
        .iter()
        .filter_map(|h| h.gas_cost_usd)
        .filter(|v| v.is_finite())
        .sum();

    let target_yield = calculators::target_yield_usd(
        total_value_usd,
        settings.apy_target,
        input.harvest_lookback_days,
    );
    let yield_efficiency = calculators::yield_efficiency(Some(realized_usd), target_yield);
    let harvest_frequency = calculators::harvest_frequency(&batch.harvests);
    let gas_efficiency = calculators::gas_efficiency(Some(realized_usd), Some(gas_cost_usd));
    let slippage = calculators::average_slippage(&batch.trades);

    let catalog = [
        MetricComputation {
            metric: MetricName::NetApy,
            value: net_apy,
            target: settings.apy_target,
            benchmark: settings.apy_benchmark,
            polarity: Polarity::HigherIsBetter,
            vs_benchmark_override: None,
        },
        MetricComputation {
            metric: MetricName::Alpha,
            value: alpha,
            target: settings.alpha_target,
            benchmark: settings.apy_benchmark,
            polarity: Polarity::HigherIsBetter,
            // alpha already *is* the distance from the benchmark
            vs_benchmark_override: Some(alpha),
        },
        MetricComputation {
            metric: MetricName::SharpeRatio,
            value: sharpe,
            target: settings.sharpe_target,
            benchmark: settings.sharpe_benchmark,
            polarity: Polarity::HigherIsBetter,
            vs_benchmark_override: None,
        },
        MetricComputation {
            metric: MetricName::MaxDrawdown,
            value: max_drawdown,
            target: settings.maxdd_limit,
            benchmark: settings.maxdd_benchmark,
            polarity: Polarity::HigherIsBetter,
            vs_benchmark_override: None,
        },
        MetricComputation {
            metric: MetricName::YieldEfficiency,
            value: yield_efficiency,
            target: Some(YIELD_EFFICIENCY_TARGET),
            benchmark: settings.yield_benchmark_pct,
            polarity: Polarity::HigherIsBetter,
            vs_benchmark_override: None,
        },
        MetricComputation {
            metric: MetricName::HarvestFrequency,
            value: harvest_frequency,
            target: settings.harvest_interval_target_days,
            benchmark: None,
            polarity: Polarity::LowerIsBetter,
            vs_benchmark_override: None,
        },
        MetricComputation {
            metric: MetricName::GasEfficiency,
            value: gas_efficiency,
            target: settings.gas_efficiency_min_ratio,
            benchmark: None,
            polarity: Polarity::HigherIsBetter,
            vs_benchmark_override: None,
        },
        MetricComputation {
            metric: MetricName::SlippageControl,
            value: slippage,
            target: settings.slippage_max_pct,
            benchmark: None,
            polarity: Polarity::LowerIsBetter,
            vs_benchmark_override: None,
        },
    ];

    catalog
        .into_iter()
        .map(|c| build_reading(c, input))
        .collect()
}

fn build_reading(c: MetricComputation, input: &PassInput) -> MetricReading {
    let previous = sequencer::previous_value(
        input.history,
        VAULT_ENTITY_KEY,
        c.metric.as_str(),
        input.run_id,
    );

    let vs_target = classify::compute_delta(c.value, c.target, c.polarity);
    let vs_benchmark = match c.vs_benchmark_override {
        Some(delta) => delta,
        None => classify::compute_delta(c.value, c.benchmark, c.polarity),
    };

    MetricReading {
        run_id: input.run_id.to_string(),
        entity_key: VAULT_ENTITY_KEY.to_string(),
        metric: c.metric,
        current_value: c.value,
        target: c.target,
        benchmark: c.benchmark,
        vs_target,
        vs_benchmark,
        status: classify::derive_status(c.value, c.target, c.polarity, input.warning_band),
        trend: classify::derive_trend(c.value, previous, classify::TREND_EPSILON),
        previous_value: previous,
        change_pct: sequencer::change_pct(c.value, previous),
        created_at: input.now.to_rfc3339(),
    }
}
