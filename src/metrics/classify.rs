/// Delta/status/trend classification.
///
/// Turns a metric's current value, target, benchmark and prior value into a
/// signed delta, a qualitative status, and a trend direction. Pure functions;
/// a missing operand degrades to the conservative answer (WARNING / FLAT)
/// instead of failing.
use super::{MetricStatus, Polarity, Trend};

/// Two readings closer than this are the same reading.
pub const TREND_EPSILON: f64 = 1e-6;

/// Signed distance from a reference, oriented so that a positive delta
/// always means "better than reference" under either polarity.
#[inline]
pub fn compute_delta(
    current: Option<f64>,
    reference: Option<f64>,
    polarity: Polarity,
) -> Option<f64> {
    let raw = current? - reference?;
    Some(match polarity {
        Polarity::HigherIsBetter => raw,
        Polarity::LowerIsBetter => -raw,
    })
}

/// Classify a value against its target. An unknown value or target is a
/// WARNING -- "needs attention", not "fine" and not "on fire".
pub fn derive_status(
    current: Option<f64>,
    target: Option<f64>,
    polarity: Polarity,
    warning_band: f64,
) -> MetricStatus {
    let (Some(current), Some(target)) = (current, target) else {
        return MetricStatus::Warning;
    };

    match polarity {
        Polarity::HigherIsBetter => {
            if current >= target {
                MetricStatus::Ok
            } else if current >= target * (1.0 - warning_band) {
                MetricStatus::Warning
            } else {
                MetricStatus::Critical
            }
        }
        Polarity::LowerIsBetter => {
            if current <= target {
                MetricStatus::Ok
            } else if current <= target * (1.0 + warning_band) {
                MetricStatus::Warning
            } else {
                MetricStatus::Critical
            }
        }
    }
}

/// Direction of change versus the previous reading.
#[inline]
pub fn derive_trend(current: Option<f64>, previous: Option<f64>, epsilon: f64) -> Trend {
    let (Some(current), Some(previous)) = (current, previous) else {
        return Trend::Flat;
    };

    let delta = current - previous;
    if delta.abs() <= epsilon {
        Trend::Flat
    } else if delta > 0.0 {
        Trend::Up
    } else {
        Trend::Down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DEFAULT_WARNING_BAND;

    #[test]
    fn test_compute_delta_higher_is_better() {
        let delta = compute_delta(Some(0.12), Some(0.1), Polarity::HigherIsBetter).unwrap();
        assert!((delta - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_compute_delta_lower_is_better_flips_sign() {
        let delta = compute_delta(Some(0.1), Some(0.2), Polarity::LowerIsBetter).unwrap();
        assert!((delta - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_compute_delta_missing_operand_is_none() {
        assert_eq!(compute_delta(None, Some(0.1), Polarity::HigherIsBetter), None);
        assert_eq!(compute_delta(Some(0.1), None, Polarity::HigherIsBetter), None);
    }

    #[test]
    fn test_derive_status_higher_is_better() {
        let status = |c| derive_status(Some(c), Some(0.1), Polarity::HigherIsBetter, DEFAULT_WARNING_BAND);
        assert_eq!(status(0.12), MetricStatus::Ok);
        assert_eq!(status(0.095), MetricStatus::Warning);
        assert_eq!(status(0.05), MetricStatus::Critical);
    }

    #[test]
    fn test_derive_status_lower_is_better() {
        let status = |c| derive_status(Some(c), Some(0.1), Polarity::LowerIsBetter, DEFAULT_WARNING_BAND);
        assert_eq!(status(0.08), MetricStatus::Ok);
        assert_eq!(status(0.105), MetricStatus::Warning);
        assert_eq!(status(0.2), MetricStatus::Critical);
    }

    #[test]
    fn test_derive_status_unknown_is_warning() {
        assert_eq!(
            derive_status(None, Some(0.1), Polarity::HigherIsBetter, DEFAULT_WARNING_BAND),
            MetricStatus::Warning
        );
        assert_eq!(
            derive_status(Some(0.1), None, Polarity::HigherIsBetter, DEFAULT_WARNING_BAND),
            MetricStatus::Warning
        );
    }

    #[test]
    fn test_derive_trend() {
        assert_eq!(derive_trend(Some(0.11), Some(0.1), TREND_EPSILON), Trend::Up);
        assert_eq!(derive_trend(Some(0.09), Some(0.1), TREND_EPSILON), Trend::Down);
        assert_eq!(derive_trend(Some(0.1), Some(0.1000000001), TREND_EPSILON), Trend::Flat);
    }

    #[test]
    fn test_derive_trend_missing_operand_is_flat() {
        assert_eq!(derive_trend(None, Some(0.1), TREND_EPSILON), Trend::Flat);
        assert_eq!(derive_trend(Some(0.1), None, TREND_EPSILON), Trend::Flat);
    }
}
