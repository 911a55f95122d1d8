/// The alert rule catalog.
///
/// Each rule resolves its threshold from the settings store by its own key,
/// extracts one input from the position snapshot, and tests a strict
/// inequality in a rule-specific direction. No threshold configured means
/// the condition can never be met -- absence is "no threshold", not zero.
use super::{ActionRequired, AutoAction, ManualReview, Priority};
use crate::settings::keys;
use crate::vault::PositionSnapshot;
use chrono::{DateTime, Utc};

const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertRule {
    Mispricing,
    HarvestReady,
    LiquidityCrisis,
    GasSpike,
    MaturityApproach,
}

impl AlertRule {
    pub const ALL: [AlertRule; 5] = [
        Self::Mispricing,
        Self::HarvestReady,
        Self::LiquidityCrisis,
        Self::GasSpike,
        Self::MaturityApproach,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mispricing => "mispricing",
            Self::HarvestReady => "harvest_ready",
            Self::LiquidityCrisis => "liquidity_crisis",
            Self::GasSpike => "gas_spike",
            Self::MaturityApproach => "maturity_approach",
        }
    }

    pub fn threshold_key(&self) -> &'static str {
        match self {
            Self::Mispricing => keys::ALERT_MISPRICING,
            Self::HarvestReady => keys::ALERT_HARVEST,
            Self::LiquidityCrisis => keys::ALERT_LIQUIDITY,
            Self::GasSpike => keys::ALERT_GAS_SPIKE,
            Self::MaturityApproach => keys::ALERT_MATURITY_DAYS,
        }
    }

    /// Fixed (priority, required action) per condition outcome.
    pub fn outcome(&self, condition_met: bool) -> (Priority, ActionRequired) {
        if !condition_met {
            return match self {
                Self::HarvestReady => (Priority::Low, ActionRequired::Wait),
                Self::LiquidityCrisis | Self::GasSpike => (Priority::Low, ActionRequired::Continue),
                _ => (Priority::Low, ActionRequired::Monitor),
            };
        }
        match self {
            Self::Mispricing => (Priority::High, ActionRequired::Rebalance),
            Self::HarvestReady => (Priority::Medium, ActionRequired::ExecuteHarvest),
            Self::LiquidityCrisis => (Priority::Critical, ActionRequired::ReducePositions),
            Self::GasSpike => (Priority::Medium, ActionRequired::DelayTransactions),
            Self::MaturityApproach => (Priority::Critical, ActionRequired::PlanRollover),
        }
    }

    /// Suggested automated response, constant per rule.
    pub fn auto_action(&self) -> AutoAction {
        match self {
            Self::Mispricing => AutoAction::SignalSwap,
            Self::HarvestReady => AutoAction::AutoHarvest,
            Self::LiquidityCrisis => AutoAction::PauseTrading,
            Self::GasSpike => AutoAction::QueueTransactions,
            Self::MaturityApproach => AutoAction::RolloverAlert,
        }
    }

    /// What a human should double-check, constant per rule.
    pub fn manual_review(&self) -> ManualReview {
        match self {
            Self::Mispricing => ManualReview::StrategyReview,
            Self::HarvestReady => ManualReview::CheckGasCost,
            Self::LiquidityCrisis => ManualReview::ReviewSizing,
            Self::GasSpike => ManualReview::CostAnalysis,
            Self::MaturityApproach => ManualReview::EmergencyPlan,
        }
    }
}

impl std::fmt::Display for AlertRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of extracting and testing one rule's input.
#[derive(Debug, Clone, Copy)]
pub struct RuleEvaluation {
    /// The value recorded on the alert (may differ from the tested value,
    /// e.g. mispricing records the signed percentage deviation)
    pub current_value: Option<f64>,
    pub condition_met: bool,
}

/// Evaluate one rule against one position snapshot.
pub fn evaluate_rule(
    rule: AlertRule,
    position: &PositionSnapshot,
    threshold: Option<f64>,
    now: DateTime<Utc>,
) -> RuleEvaluation {
    match rule {
        AlertRule::Mispricing => {
            let deviation = match (position.price_usd, position.fair_value_usd) {
                (Some(price), Some(fair)) if fair != 0.0 => {
                    Some(((price - fair).abs() / fair.abs(), (price - fair) / fair * 100.0))
                }
                _ => None,
            };
            let condition_met = matches!((deviation, threshold), (Some((ratio, _)), Some(t)) if ratio > t);
            RuleEvaluation {
                current_value: deviation.map(|(_, signed_pct)| signed_pct),
                condition_met,
            }
        }
        AlertRule::HarvestReady => {
            let accrued = position.accrued_yield_usd;
            RuleEvaluation {
                current_value: accrued,
                condition_met: matches!((accrued, threshold), (Some(v), Some(t)) if v > t),
            }
        }
        // The liquidity signal is proxied by the gas reading and tested
        // against the negated threshold ("below" semantics, unlike the
        // other rules' "above").
        AlertRule::LiquidityCrisis => {
            let proxy = position.gas_price_gwei;
            RuleEvaluation {
                current_value: proxy,
                condition_met: matches!((proxy, threshold), (Some(v), Some(t)) if v < -t),
            }
        }
        AlertRule::GasSpike => {
            let gas = position.gas_price_gwei;
            RuleEvaluation {
                current_value: gas,
                condition_met: matches!((gas, threshold), (Some(v), Some(t)) if v > t),
            }
        }
        AlertRule::MaturityApproach => {
            let days_left = position
                .maturity_ts
                .map(|m| (m - now).num_milliseconds() as f64 / MS_PER_DAY);
            RuleEvaluation {
                current_value: days_left,
                condition_met: matches!((days_left, threshold), (Some(v), Some(t)) if v < t),
            }
        }
    }
}
