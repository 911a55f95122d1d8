/// Point-in-time ordering helpers over stored readings.
///
/// Result tables are append-only, so "latest" and "previous" are questions
/// about creation order, answered here with ordered scans -- never by
/// re-sorting on business timestamps.
use std::collections::HashSet;
use std::hash::Hash;

/// A stored reading in creation order. Rows are handed to the functions
/// below most-recently-created first.
#[derive(Debug, Clone)]
pub struct StoredReading {
    pub run_id: String,
    pub entity_key: String,
    pub metric: String,
    pub value: Option<f64>,
}

/// Deduplicate a descending-by-creation sequence down to the first row seen
/// per key: most-recently-created wins. An ordered scan with a seen-set, so
/// the input's ordering semantics are preserved exactly.
pub fn latest_per_key<'a, T, K, F>(rows: &'a [T], key_fn: F) -> Vec<&'a T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut latest = Vec::new();
    for row in rows {
        if seen.insert(key_fn(row)) {
            latest.push(row);
        }
    }
    latest
}

/// Most recent reading for (entity, metric) created strictly before the
/// current run. None means this is the first observation ever for that pair.
pub fn previous_value(
    rows: &[StoredReading],
    entity_key: &str,
    metric: &str,
    current_run: &str,
) -> Option<f64> {
    rows.iter()
        .find(|r| r.run_id != current_run && r.entity_key == entity_key && r.metric == metric)
        .and_then(|r| r.value)
}

/// Relative change versus the previous reading: (current - previous) / |previous|.
/// A zero previous value is not a division -- the change is None when the
/// current value moved away from zero, and zero when both are zero.
pub fn change_pct(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let (current, previous) = (current?, previous?);
    if previous == 0.0 {
        return if current == 0.0 { Some(0.0) } else { None };
    }
    let change = (current - previous) / previous.abs();
    change.is_finite().then_some(change)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(run: &str, entity: &str, metric: &str, value: Option<f64>) -> StoredReading {
        StoredReading {
            run_id: run.into(),
            entity_key: entity.into(),
            metric: metric.into(),
            value,
        }
    }

    #[test]
    fn test_latest_per_key_first_seen_wins() {
        let rows = vec![
            reading("r3", "a", "net_apy", Some(0.3)),
            reading("r2", "a", "net_apy", Some(0.2)),
            reading("r2", "b", "net_apy", Some(0.5)),
            reading("r1", "a", "net_apy", Some(0.1)),
        ];
        let latest = latest_per_key(&rows, |r| r.entity_key.clone());
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].value, Some(0.3));
        assert_eq!(latest[1].value, Some(0.5));
    }

    #[test]
    fn test_previous_value_matches_entity_and_metric() {
        let rows = vec![
            reading("r2", "vault", "net_apy", Some(0.09)),
            reading("r2", "vault", "alpha", Some(0.5)),
            reading("r1", "vault", "net_apy", Some(0.08)),
        ];
        // previous for the in-flight run r3 is the newest r2 row of the same metric
        assert_eq!(previous_value(&rows, "vault", "net_apy", "r3"), Some(0.09));
        assert_eq!(previous_value(&rows, "vault", "alpha", "r3"), Some(0.5));
    }

    #[test]
    fn test_previous_value_excludes_current_run() {
        let rows = vec![
            reading("r2", "vault", "net_apy", Some(0.09)),
            reading("r1", "vault", "net_apy", Some(0.08)),
        ];
        assert_eq!(previous_value(&rows, "vault", "net_apy", "r2"), Some(0.08));
    }

    #[test]
    fn test_previous_value_first_observation_is_none() {
        let rows = vec![reading("r1", "vault", "alpha", Some(0.5))];
        assert_eq!(previous_value(&rows, "vault", "net_apy", "r2"), None);
        assert_eq!(previous_value(&[], "vault", "net_apy", "r1"), None);
    }

    #[test]
    fn test_change_pct() {
        assert!((change_pct(Some(0.12), Some(0.1)).unwrap() - 0.2).abs() < 1e-9);
        assert!((change_pct(Some(0.08), Some(-0.1)).unwrap() - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_change_pct_zero_previous() {
        assert_eq!(change_pct(Some(0.1), Some(0.0)), None);
        assert_eq!(change_pct(Some(0.0), Some(0.0)), Some(0.0));
    }

    #[test]
    fn test_change_pct_missing_operand_is_none() {
        assert_eq!(change_pct(None, Some(0.1)), None);
        assert_eq!(change_pct(Some(0.1), None), None);
    }
}
