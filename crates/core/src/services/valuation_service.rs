use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

use crate::models::holding::Holding;
use crate::models::valuation::{PortfolioValuation, PositionValuation};

/// Computes per-holding and aggregate value, profit/loss, and return
/// rates from a holdings set and one price snapshot.
///
/// Pure arithmetic — no I/O, no clock. The price map must come from a
/// single batch resolution so the totals reflect one consistent snapshot
/// rather than prices fetched at different instants.
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Valuate `holdings` against `prices`.
    ///
    /// Holdings whose symbol is absent from `prices` are excluded from
    /// the positions and totals, and reported in `missing` — the decision
    /// to substitute anything (zero, last close, an "unavailable" badge)
    /// belongs to the caller.
    #[must_use]
    pub fn valuate(
        &self,
        holdings: &[Holding],
        prices: &HashMap<String, Decimal>,
    ) -> PortfolioValuation {
        let mut positions = Vec::with_capacity(holdings.len());
        let mut missing = Vec::new();

        let mut total_value = Decimal::ZERO;
        let mut total_cost = Decimal::ZERO;
        let mut total_profit_loss = Decimal::ZERO;

        for holding in holdings {
            let Some(&price) = prices.get(&holding.symbol) else {
                missing.push(holding.symbol.clone());
                continue;
            };

            let current_value = price * holding.quantity;
            let cost = holding.average_cost * holding.quantity;
            let profit_loss = (price - holding.average_cost) * holding.quantity;

            total_value += current_value;
            total_cost += cost;
            total_profit_loss += profit_loss;

            positions.push(PositionValuation {
                symbol: holding.symbol.clone(),
                quantity: holding.quantity,
                average_cost: holding.average_cost,
                current_price: price,
                current_value,
                cost,
                profit_loss,
                profit_loss_rate: Self::rate(profit_loss, cost),
            });
        }

        PortfolioValuation {
            positions,
            missing,
            total_value,
            total_cost,
            total_profit_loss,
            total_profit_loss_rate: Self::rate(total_profit_loss, total_cost),
        }
    }

    /// profit_loss / cost * 100, rounded to 2 decimal places.
    /// A zero cost yields a 0 rate — a guard, not an error.
    fn rate(profit_loss: Decimal, cost: Decimal) -> Decimal {
        if cost == Decimal::ZERO {
            return Decimal::ZERO;
        }
        (profit_loss / cost * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}
