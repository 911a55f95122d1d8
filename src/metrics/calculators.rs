/// Pure metric calculators.
///
/// Every function here is a plain transform over already-fetched, in-memory
/// observations: no IO, no clock, no shared state. Bad input is data, not an
/// error -- non-finite readings are skipped, impossible denominators produce
/// None, and nothing in this module can panic or return a non-finite number.
///
/// Series calculators sort their own input by timestamp; callers must not
/// rely on storage order.
use crate::vault::{HarvestEvent, NavPoint, PositionSnapshot, TradeExecution};
use statrs::statistics::Statistics;

const DAYS_PER_YEAR: f64 = 365.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Value-weighted net APY across positions: sum(apy * value) / sum(value).
/// Positions without a finite APY or a positive USD value carry no weight.
pub fn weighted_net_apy(positions: &[PositionSnapshot]) -> Option<f64> {
    if positions.is_empty() {
        return None;
    }

    let mut weighted = 0.0;
    let mut total_value = 0.0;

    for p in positions {
        let (Some(apy), Some(value)) = (p.implied_apy, p.value_usd) else {
            continue;
        };
        if !apy.is_finite() || !value.is_finite() || value <= 0.0 {
            continue;
        }
        weighted += apy * value;
        total_value += value;
    }

    if total_value == 0.0 {
        return None;
    }

    Some(weighted / total_value)
}

/// Outperformance of net APY over the benchmark rate.
#[inline]
pub fn alpha(net_apy: Option<f64>, benchmark_apy: Option<f64>) -> Option<f64> {
    Some(net_apy? - benchmark_apy?)
}

/// Consecutive-day returns from NAV history: (nav_t - nav_{t-1}) / nav_{t-1}.
/// Pairs where either NAV is non-positive are skipped, as are non-finite
/// results. Fewer than two points yields an empty series.
pub fn daily_returns(nav_points: &[NavPoint]) -> Vec<f64> {
    if nav_points.len() < 2 {
        return Vec::new();
    }

    let mut sorted: Vec<NavPoint> = nav_points.to_vec();
    sorted.sort_by_key(|p| p.ts);

    let mut returns = Vec::with_capacity(sorted.len() - 1);
    for pair in sorted.windows(2) {
        let (prev, cur) = (pair[0].nav_usd, pair[1].nav_usd);
        if prev <= 0.0 || cur <= 0.0 {
            continue;
        }
        let r = (cur - prev) / prev;
        if r.is_finite() {
            returns.push(r);
        }
    }

    returns
}

/// Annualized Sharpe ratio over daily returns.
///
/// sharpe = (mean(excess) / stddev(excess)) * sqrt(365)
///
/// The annual risk-free rate is converted to a daily rate by dividing by 365
/// (missing rate = 0). Sample statistics (n - 1 denominator) over at least
/// two finite excess returns; degenerate variance yields None.
pub fn sharpe_ratio(daily_returns: &[f64], annual_risk_free: Option<f64>) -> Option<f64> {
    if daily_returns.len() < 2 {
        return None;
    }

    let rf_daily = annual_risk_free.unwrap_or(0.0) / DAYS_PER_YEAR;
    let excess: Vec<f64> = daily_returns
        .iter()
        .map(|r| r - rf_daily)
        .filter(|r| r.is_finite())
        .collect();

    if excess.len() < 2 {
        return None;
    }

    let mean = excess.iter().mean();
    let variance = excess.iter().variance();
    if !variance.is_finite() || variance <= 0.0 {
        return None;
    }

    let sharpe = (mean / variance.sqrt()) * DAYS_PER_YEAR.sqrt();
    sharpe.is_finite().then_some(sharpe)
}

/// Largest peak-to-trough NAV decline, as a negative fraction.
/// Returns Some(0.0) when NAV never fell below a prior peak; None only for
/// an empty series.
pub fn max_drawdown(nav_points: &[NavPoint]) -> Option<f64> {
    if nav_points.is_empty() {
        return None;
    }

    let mut sorted: Vec<NavPoint> = nav_points.to_vec();
    sorted.sort_by_key(|p| p.ts);

    let mut peak = sorted[0].nav_usd;
    let mut worst = 0.0;

    for p in &sorted {
        if p.nav_usd > peak {
            peak = p.nav_usd;
        }
        if peak <= 0.0 {
            continue;
        }
        let drawdown = (p.nav_usd - peak) / peak;
        if drawdown < worst {
            worst = drawdown;
        }
    }

    Some(worst)
}

/// Realized yield as a percentage of the target: (realized / target) * 100.
#[inline]
pub fn yield_efficiency(realized_usd: Option<f64>, target_usd: Option<f64>) -> Option<f64> {
    let (realized, target) = (realized_usd?, target_usd?);
    if target <= 0.0 {
        return None;
    }
    let ratio = (realized / target) * 100.0;
    ratio.is_finite().then_some(ratio)
}

/// Pro-rated yield the vault should have produced over the lookback window:
/// total_value * target_apy * (days / 365).
#[inline]
pub fn target_yield_usd(
    total_value_usd: f64,
    target_apy: Option<f64>,
    lookback_days: i64,
) -> Option<f64> {
    if !total_value_usd.is_finite() || total_value_usd <= 0.0 {
        return None;
    }
    Some(total_value_usd * target_apy? * (lookback_days as f64 / DAYS_PER_YEAR))
}

/// Mean gap in days between consecutive harvests. Needs at least two events
/// and at least one finite, non-negative gap.
pub fn harvest_frequency(events: &[HarvestEvent]) -> Option<f64> {
    if events.len() < 2 {
        return None;
    }

    let mut sorted: Vec<HarvestEvent> = events.to_vec();
    sorted.sort_by_key(|e| e.ts);

    let mut gaps = Vec::with_capacity(sorted.len() - 1);
    for pair in sorted.windows(2) {
        let gap_days = (pair[1].ts - pair[0].ts).num_milliseconds() as f64 / MS_PER_DAY;
        if gap_days.is_finite() && gap_days >= 0.0 {
            gaps.push(gap_days);
        }
    }

    if gaps.is_empty() {
        return None;
    }

    Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
}

/// USD of yield produced per USD of gas spent.
#[inline]
pub fn gas_efficiency(total_yield_usd: Option<f64>, total_gas_cost_usd: Option<f64>) -> Option<f64> {
    let (yield_usd, gas_usd) = (total_yield_usd?, total_gas_cost_usd?);
    if gas_usd <= 0.0 {
        return None;
    }
    let ratio = yield_usd / gas_usd;
    ratio.is_finite().then_some(ratio)
}

/// Mean absolute deviation of executed vs quoted price, in percent.
/// Trades with a non-positive quote are skipped.
pub fn average_slippage(trades: &[TradeExecution]) -> Option<f64> {
    if trades.is_empty() {
        return None;
    }

    let mut slippages = Vec::with_capacity(trades.len());
    for t in trades {
        if t.quote_price <= 0.0 {
            continue;
        }
        let pct = (t.execution_price - t.quote_price).abs() / t.quote_price * 100.0;
        if pct.is_finite() {
            slippages.push(pct);
        }
    }

    if slippages.is_empty() {
        return None;
    }

    Some(slippages.iter().sum::<f64>() / slippages.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pos(apy: f64, value: f64) -> PositionSnapshot {
        PositionSnapshot {
            entity_key: "pool".into(),
            implied_apy: Some(apy),
            value_usd: Some(value),
            ..Default::default()
        }
    }

    fn nav(day: u32, value: f64) -> NavPoint {
        NavPoint {
            ts: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            nav_usd: value,
        }
    }

    fn harvest(day: u32) -> HarvestEvent {
        HarvestEvent {
            ts: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            realized_usd: Some(100.0),
            gas_cost_usd: Some(5.0),
        }
    }

    #[test]
    fn test_weighted_net_apy() {
        let result = weighted_net_apy(&[pos(0.1, 1_000.0), pos(0.2, 2_000.0)]);
        assert!((result.unwrap() - 0.1666666).abs() < 1e-4);
    }

    #[test]
    fn test_weighted_net_apy_single_position_is_its_apy() {
        let result = weighted_net_apy(&[pos(0.085, 12_345.0)]);
        assert!((result.unwrap() - 0.085).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_net_apy_skips_invalid_positions() {
        let result = weighted_net_apy(&[pos(f64::NAN, 1_000.0), pos(0.1, -50.0), pos(0.2, 2_000.0)]);
        assert!((result.unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_net_apy_empty_or_weightless_is_none() {
        assert_eq!(weighted_net_apy(&[]), None);
        assert_eq!(weighted_net_apy(&[pos(0.1, 0.0)]), None);
    }

    #[test]
    fn test_alpha() {
        assert!((alpha(Some(0.15), Some(0.12)).unwrap() - 0.03).abs() < 1e-12);
        assert_eq!(alpha(None, Some(0.12)), None);
        assert_eq!(alpha(Some(0.15), None), None);
    }

    #[test]
    fn test_daily_returns() {
        let returns = daily_returns(&[nav(1, 100.0), nav(2, 102.0), nav(3, 101.0)]);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.02).abs() < 1e-6);
        assert!((returns[1] - (-0.009803)).abs() < 1e-4);
    }

    #[test]
    fn test_daily_returns_sorts_input() {
        let returns = daily_returns(&[nav(3, 101.0), nav(1, 100.0), nav(2, 102.0)]);
        assert!((returns[0] - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_daily_returns_short_series_is_empty() {
        assert!(daily_returns(&[nav(1, 100.0)]).is_empty());
        assert!(daily_returns(&[]).is_empty());
    }

    #[test]
    fn test_daily_returns_skips_non_positive_nav() {
        let returns = daily_returns(&[nav(1, 100.0), nav(2, 0.0), nav(3, 110.0)]);
        assert!(returns.is_empty());
    }

    #[test]
    fn test_sharpe_ratio() {
        let sharpe = sharpe_ratio(&[0.01, 0.02, -0.01, 0.015], Some(0.05)).unwrap();
        assert!((sharpe - 12.51).abs() < 0.01, "sharpe={sharpe}");
    }

    #[test]
    fn test_sharpe_ratio_needs_two_returns() {
        assert_eq!(sharpe_ratio(&[0.01], Some(0.05)), None);
        assert_eq!(sharpe_ratio(&[], None), None);
    }

    #[test]
    fn test_sharpe_ratio_zero_variance_is_none() {
        assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01], Some(0.0)), None);
    }

    #[test]
    fn test_max_drawdown() {
        let dd = max_drawdown(&[nav(1, 100.0), nav(2, 120.0), nav(3, 90.0), nav(4, 110.0)]);
        assert!((dd.unwrap() - (-0.25)).abs() < 1e-9);
    }

    #[test]
    fn test_max_drawdown_monotonic_rise_is_zero() {
        let dd = max_drawdown(&[nav(1, 100.0), nav(2, 110.0), nav(3, 120.0)]);
        assert_eq!(dd, Some(0.0));
    }

    #[test]
    fn test_max_drawdown_empty_is_none() {
        assert_eq!(max_drawdown(&[]), None);
    }

    #[test]
    fn test_max_drawdown_single_point_is_zero() {
        assert_eq!(max_drawdown(&[nav(1, 100.0)]), Some(0.0));
    }

    #[test]
    fn test_yield_efficiency() {
        assert!((yield_efficiency(Some(150.0), Some(100.0)).unwrap() - 150.0).abs() < 1e-9);
        assert_eq!(yield_efficiency(Some(150.0), Some(0.0)), None);
        assert_eq!(yield_efficiency(Some(150.0), Some(-10.0)), None);
        assert_eq!(yield_efficiency(None, Some(100.0)), None);
    }

    #[test]
    fn test_target_yield_usd() {
        let target = target_yield_usd(100_000.0, Some(0.073), 30).unwrap();
        assert!((target - 100_000.0 * 0.073 * (30.0 / 365.0)).abs() < 1e-9);
        assert_eq!(target_yield_usd(0.0, Some(0.073), 30), None);
        assert_eq!(target_yield_usd(100_000.0, None, 30), None);
    }

    #[test]
    fn test_harvest_frequency() {
        // 5 days, then 6 days apart
        let freq = harvest_frequency(&[harvest(1), harvest(6), harvest(12)]);
        assert!((freq.unwrap() - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_harvest_frequency_single_event_is_none() {
        assert_eq!(harvest_frequency(&[harvest(1)]), None);
        assert_eq!(harvest_frequency(&[]), None);
    }

    #[test]
    fn test_gas_efficiency() {
        assert!((gas_efficiency(Some(100.0), Some(10.0)).unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(gas_efficiency(Some(100.0), Some(0.0)), None);
        assert_eq!(gas_efficiency(None, Some(10.0)), None);
    }

    #[test]
    fn test_average_slippage() {
        let trades = [
            TradeExecution { quote_price: 100.0, execution_price: 101.0 },
            TradeExecution { quote_price: 200.0, execution_price: 198.0 },
        ];
        assert!((average_slippage(&trades).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_slippage_ignores_bad_quotes() {
        let trades = [
            TradeExecution { quote_price: 0.0, execution_price: 101.0 },
            TradeExecution { quote_price: -5.0, execution_price: 1.0 },
        ];
        assert_eq!(average_slippage(&trades), None);
    }
}
