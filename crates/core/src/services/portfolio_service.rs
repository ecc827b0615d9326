use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::store::traits::HoldingsStore;

/// Decimal places kept on a recomputed average cost.
const AVG_COST_SCALE: u32 = 4;

/// Manages users' holdings: add with weighted-average merge, update,
/// remove. Input validation happens here, before anything touches the
/// store.
pub struct PortfolioService;

impl PortfolioService {
    pub fn new() -> Self {
        Self
    }

    /// Record a buy.
    ///
    /// A new symbol creates a position; an existing symbol merges by
    /// weighted average:
    /// `new_avg = (old_avg*old_qty + buy_avg*buy_qty) / (old_qty + buy_qty)`.
    /// Returns the resulting position.
    pub async fn add_holding<S>(
        &self,
        store: &S,
        user_id: u64,
        symbol: &str,
        quantity: Decimal,
        average_cost: Decimal,
    ) -> Result<Holding, CoreError>
    where
        S: HoldingsStore + ?Sized,
    {
        Self::validate(quantity, average_cost)?;

        let symbol = symbol.to_uppercase();
        let holdings = store.load_holdings(user_id).await?;

        let merged = match holdings.iter().find(|h| h.symbol == symbol) {
            Some(existing) => {
                let total_quantity = existing.quantity + quantity;
                let total_cost =
                    existing.average_cost * existing.quantity + average_cost * quantity;
                let new_avg = (total_cost / total_quantity).round_dp_with_strategy(
                    AVG_COST_SCALE,
                    RoundingStrategy::MidpointAwayFromZero,
                );
                Holding::new(symbol, total_quantity, new_avg)
            }
            None => Holding::new(symbol, quantity, average_cost),
        };

        store.upsert_holding(user_id, merged.clone()).await?;
        log::info!(
            "holding upserted for user {user_id}: {} x{} @ {}",
            merged.symbol,
            merged.quantity,
            merged.average_cost
        );
        Ok(merged)
    }

    /// Replace an existing position's quantity and average cost outright
    /// (no merge). Errors when the user holds no such symbol.
    pub async fn update_holding<S>(
        &self,
        store: &S,
        user_id: u64,
        symbol: &str,
        quantity: Decimal,
        average_cost: Decimal,
    ) -> Result<Holding, CoreError>
    where
        S: HoldingsStore + ?Sized,
    {
        Self::validate(quantity, average_cost)?;

        let symbol = symbol.to_uppercase();
        let holdings = store.load_holdings(user_id).await?;
        if !holdings.iter().any(|h| h.symbol == symbol) {
            return Err(CoreError::NotFound(format!(
                "user {user_id} holds no {symbol}"
            )));
        }

        let updated = Holding::new(symbol, quantity, average_cost);
        store.upsert_holding(user_id, updated.clone()).await?;
        Ok(updated)
    }

    /// Remove a position entirely. Errors when the user holds no such
    /// symbol.
    pub async fn remove_holding<S>(
        &self,
        store: &S,
        user_id: u64,
        symbol: &str,
    ) -> Result<(), CoreError>
    where
        S: HoldingsStore + ?Sized,
    {
        let removed = store.remove_holding(user_id, &symbol.to_uppercase()).await?;
        if !removed {
            return Err(CoreError::NotFound(format!(
                "user {user_id} holds no {}",
                symbol.to_uppercase()
            )));
        }
        Ok(())
    }

    /// Non-positive quantity or cost is rejected before any store write.
    fn validate(quantity: Decimal, average_cost: Decimal) -> Result<(), CoreError> {
        if quantity <= Decimal::ZERO {
            return Err(CoreError::Validation("quantity must be positive".into()));
        }
        if average_cost <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "average cost must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PortfolioService {
    fn default() -> Self {
        Self::new()
    }
}
