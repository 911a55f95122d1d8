/// Per-position alert evaluation with failure isolation.
///
/// One pass emits exactly one AlertEvent per rule per position. A position
/// that fails validation is logged and skipped -- it contributes no events,
/// and the remaining positions are unaffected.
use super::rules::{self, AlertRule};
use super::AlertEvent;
use crate::errors::EngineResult;
use crate::settings::SettingsMap;
use crate::vault::PositionSnapshot;
use chrono::{DateTime, Utc};
use smallvec::SmallVec;

/// Result of one alert pass over a batch of positions.
#[derive(Debug, Default)]
pub struct AlertPassOutcome {
    pub events: Vec<AlertEvent>,
    /// Positions dropped by validation; each one was logged when it failed
    pub failed_positions: usize,
}

/// Evaluate every rule for every position. Thresholds are resolved once per
/// rule from the settings map; a missing setting leaves that rule quiet.
pub fn evaluate_positions(
    positions: &[PositionSnapshot],
    settings: &SettingsMap,
    run_id: &str,
    now: DateTime<Utc>,
) -> AlertPassOutcome {
    let thresholds: [(AlertRule, Option<f64>); 5] = AlertRule::ALL
        .map(|rule| (rule, settings.numeric(rule.threshold_key())));

    let mut outcome = AlertPassOutcome::default();
    for position in positions {
        match evaluate_position(position, &thresholds, run_id, now) {
            Ok(events) => outcome.events.extend(events),
            Err(e) => {
                tracing::warn!(error = %e, "skipping position in alert pass");
                outcome.failed_positions += 1;
            }
        }
    }
    outcome
}

fn evaluate_position(
    position: &PositionSnapshot,
    thresholds: &[(AlertRule, Option<f64>)],
    run_id: &str,
    now: DateTime<Utc>,
) -> EngineResult<SmallVec<[AlertEvent; 5]>> {
    position.validate()?;

    let mut events = SmallVec::new();
    for &(rule, threshold) in thresholds {
        let eval = rules::evaluate_rule(rule, position, threshold, now);
        let (priority, action_required) = rule.outcome(eval.condition_met);

        events.push(AlertEvent {
            id: uuid::Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            rule,
            position_key: position.entity_key.clone(),
            condition_met: eval.condition_met,
            current_value: eval.current_value,
            threshold,
            priority,
            action_required,
            auto_action: rule.auto_action(),
            manual_review: rule.manual_review(),
            created_at: now.to_rfc3339(),
        });
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::Priority;
    use crate::settings::keys;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn settings_with_thresholds() -> SettingsMap {
        let mut entries = HashMap::new();
        entries.insert(keys::ALERT_MISPRICING.to_string(), "0.02".to_string());
        entries.insert(keys::ALERT_HARVEST.to_string(), "100".to_string());
        entries.insert(keys::ALERT_GAS_SPIKE.to_string(), "40".to_string());
        SettingsMap::new(entries)
    }

    fn position(key: &str) -> PositionSnapshot {
        PositionSnapshot {
            entity_key: key.into(),
            price_usd: Some(0.95),
            fair_value_usd: Some(1.0),
            accrued_yield_usd: Some(120.0),
            gas_price_gwei: Some(45.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_one_event_per_rule_per_position() {
        let positions = vec![position("pool-a"), position("pool-b")];
        let outcome = evaluate_positions(&positions, &settings_with_thresholds(), "run-1", now());
        assert_eq!(outcome.events.len(), 2 * AlertRule::ALL.len());
        assert_eq!(outcome.failed_positions, 0);
        for rule in AlertRule::ALL {
            let count = outcome.events.iter().filter(|e| e.rule == rule).count();
            assert_eq!(count, 2, "{rule} should appear once per position");
        }
    }

    #[test]
    fn test_malformed_position_is_isolated() {
        let mut bad = position("pool-bad");
        bad.value_usd = Some(f64::NAN);
        let positions = vec![position("pool-a"), bad, position("pool-c")];

        let outcome = evaluate_positions(&positions, &settings_with_thresholds(), "run-1", now());
        assert_eq!(outcome.failed_positions, 1);
        assert_eq!(outcome.events.len(), 2 * AlertRule::ALL.len());
        assert!(outcome.events.iter().all(|e| e.position_key != "pool-bad"));
    }

    #[test]
    fn test_conditions_and_priorities() {
        let outcome = evaluate_positions(&[position("pool-a")], &settings_with_thresholds(), "run-1", now());

        let by_rule = |rule| outcome.events.iter().find(|e| e.rule == rule).unwrap();

        // 5% deviation over a 2% threshold
        let mispricing = by_rule(AlertRule::Mispricing);
        assert!(mispricing.condition_met);
        assert_eq!(mispricing.priority, Priority::High);

        // accrued 120 over threshold 100
        let harvest = by_rule(AlertRule::HarvestReady);
        assert!(harvest.condition_met);

        // gas 45 over threshold 40
        let gas = by_rule(AlertRule::GasSpike);
        assert!(gas.condition_met);

        // no liquidity or maturity thresholds configured -> quiet, low priority
        let liquidity = by_rule(AlertRule::LiquidityCrisis);
        assert!(!liquidity.condition_met);
        assert_eq!(liquidity.priority, Priority::Low);
        assert_eq!(liquidity.threshold, None);

        let maturity = by_rule(AlertRule::MaturityApproach);
        assert!(!maturity.condition_met);
    }

    #[test]
    fn test_empty_settings_keep_every_rule_quiet() {
        let outcome = evaluate_positions(
            &[position("pool-a")],
            &SettingsMap::default(),
            "run-1",
            now(),
        );
        assert_eq!(outcome.events.len(), AlertRule::ALL.len());
        assert!(outcome.events.iter().all(|e| !e.condition_met));
    }
}
