pub mod evaluator;
pub mod rules;

pub use rules::AlertRule;

/// Closed enumerations for alert metadata. Every rule maps its condition to
/// a fixed tuple of these; nothing downstream ever sees a free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequired {
    /// Neutral default: keep watching, act on nothing
    Monitor,
    Rebalance,
    ExecuteHarvest,
    Wait,
    ReducePositions,
    DelayTransactions,
    Continue,
    PlanRollover,
}

impl ActionRequired {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Rebalance => "rebalance",
            Self::ExecuteHarvest => "execute_harvest",
            Self::Wait => "wait",
            Self::ReducePositions => "reduce_positions",
            Self::DelayTransactions => "delay_transactions",
            Self::Continue => "continue",
            Self::PlanRollover => "plan_rollover",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoAction {
    SignalSwap,
    AutoHarvest,
    PauseTrading,
    QueueTransactions,
    RolloverAlert,
}

impl AutoAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignalSwap => "signal_swap",
            Self::AutoHarvest => "auto_harvest",
            Self::PauseTrading => "pause_trading",
            Self::QueueTransactions => "queue_transactions",
            Self::RolloverAlert => "rollover_alert",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualReview {
    StrategyReview,
    CheckGasCost,
    ReviewSizing,
    CostAnalysis,
    EmergencyPlan,
}

impl ManualReview {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrategyReview => "strategy_review",
            Self::CheckGasCost => "check_gas_cost",
            Self::ReviewSizing => "review_sizing",
            Self::CostAnalysis => "cost_analysis",
            Self::EmergencyPlan => "emergency_plan",
        }
    }
}

/// One rule evaluation for one position in one pass. Append-only history;
/// "latest per (rule, position)" is a query-time view, never an update.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertEvent {
    pub id: String,
    pub run_id: String,
    pub rule: AlertRule,
    pub position_key: String,
    pub condition_met: bool,
    pub current_value: Option<f64>,
    pub threshold: Option<f64>,
    pub priority: Priority,
    pub action_required: ActionRequired,
    pub auto_action: AutoAction,
    pub manual_review: ManualReview,
    /// RFC 3339
    pub created_at: String,
}
