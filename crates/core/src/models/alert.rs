use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The condition under which a price alert fires.
///
/// A closed enum with exhaustive matching everywhere it is evaluated, so
/// adding a new alert kind is a compile-time-checked change rather than a
/// string comparison scattered across the codebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlertCondition {
    /// Fires when the current price reaches or exceeds `price`.
    Target { price: Decimal },
    /// Fires when the current price drops to or below `price`.
    StopLoss { price: Decimal },
    /// Fires when the magnitude of the change versus the previous price
    /// point reaches `threshold` percent (sign of the threshold is ignored).
    PercentMove { threshold: Decimal },
}

impl AlertCondition {
    /// Evaluate the condition against the current price and, where needed,
    /// the previous price point.
    ///
    /// Returns `None` when the condition cannot be evaluated this cycle:
    /// a `PercentMove` with no usable previous price. The caller skips the
    /// alert and retries next cycle — skipping is not a state change.
    #[must_use]
    pub fn is_met(&self, current: Decimal, previous: Option<Decimal>) -> Option<bool> {
        match self {
            AlertCondition::Target { price } => Some(current >= *price),
            AlertCondition::StopLoss { price } => Some(current <= *price),
            AlertCondition::PercentMove { threshold } => {
                let previous = previous?;
                if previous <= Decimal::ZERO {
                    return None;
                }
                let change_pct = (current - previous) / previous * Decimal::ONE_HUNDRED;
                Some(change_pct.abs() >= threshold.abs())
            }
        }
    }

    /// Human-readable message for a fired alert.
    #[must_use]
    pub fn fired_message(&self, symbol: &str, current: Decimal, previous: Option<Decimal>) -> String {
        match self {
            AlertCondition::Target { price } => {
                format!("{symbol} reached target price {price} (current: {current})")
            }
            AlertCondition::StopLoss { price } => {
                format!("{symbol} fell to stop-loss price {price} (current: {current})")
            }
            AlertCondition::PercentMove { threshold } => {
                let change_pct = previous
                    .filter(|p| *p > Decimal::ZERO)
                    .map(|p| (current - p) / p * Decimal::ONE_HUNDRED)
                    .unwrap_or_default();
                format!(
                    "{symbol} moved {:.2}% against the previous close, past the {}% threshold (current: {current})",
                    change_pct,
                    threshold.abs()
                )
            }
        }
    }
}

/// A user-created price alert.
///
/// State machine: ACTIVE (`triggered = false`) → FIRED (`triggered = true`),
/// terminal. The evaluator flips the flag exactly once; re-arming is a user
/// action (delete and recreate), never automatic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: Uuid,
    pub user_id: u64,
    pub symbol: String,
    pub condition: AlertCondition,
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PriceAlert {
    pub fn new(user_id: u64, symbol: impl Into<String>, condition: AlertCondition) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol: symbol.into().to_uppercase(),
            condition,
            triggered: false,
            triggered_at: None,
            created_at: Utc::now(),
        }
    }
}
