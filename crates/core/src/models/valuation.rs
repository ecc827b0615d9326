use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Valuation of a single priced position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionValuation {
    pub symbol: String,

    /// Units held
    pub quantity: Decimal,

    /// Average buy price per unit
    pub average_cost: Decimal,

    /// Most recent known price used for this valuation
    pub current_price: Decimal,

    /// current_price * quantity
    pub current_value: Decimal,

    /// average_cost * quantity
    pub cost: Decimal,

    /// (current_price - average_cost) * quantity
    pub profit_loss: Decimal,

    /// profit_loss / cost * 100, rounded to 2 decimal places; 0 when cost is 0
    pub profit_loss_rate: Decimal,
}

/// Valuation of a whole portfolio against one consistent price snapshot.
///
/// Holdings whose symbol had no resolvable price are excluded from
/// `positions` and from every total, and listed in `missing` instead.
/// The caller decides how to render them — the engine never silently
/// substitutes zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValuation {
    /// Per-holding breakdown, priced holdings only
    pub positions: Vec<PositionValuation>,

    /// Symbols that could not be priced this request
    pub missing: Vec<String>,

    pub total_value: Decimal,
    pub total_cost: Decimal,
    pub total_profit_loss: Decimal,

    /// total_profit_loss / total_cost * 100, rounded to 2 decimal places;
    /// 0 when total_cost is 0
    pub total_profit_loss_rate: Decimal,
}
