use std::sync::Arc;

use crate::ai::traits::{CommentaryGenerator, GenerationOptions};
use crate::errors::CoreError;
use crate::models::analysis::{AnalysisRecord, AnalysisReport, AnalysisStatus};
use crate::models::holding::{fingerprint, Holding};
use crate::models::settings::AiSettings;
use crate::models::valuation::PortfolioValuation;
use crate::services::price_service::PriceService;
use crate::services::valuation_service::ValuationService;
use crate::store::traits::{AnalysisStore, HoldingsStore, PriceStore};

const SYSTEM_PROMPT: &str = "\
You are an AI portfolio analyst for individual investors.

Rules:
1. The return, profit/loss, and allocation figures are precomputed; interpret them as given and never attempt new calculations.
2. Never directly instruct the reader to buy, sell, or cut a specific position.
3. Avoid definitive wording such as \"recommended\", \"guaranteed\", or \"must\".
4. Phrase every suggested action as something the investor could consider or review.
5. Keep an objective, neutral report tone centered on market structure rather than predictions.

Output format:
- Portfolio interpretation (1-2 sentences)
- Key risk or structural characteristic (1-2 sentences)
- Options the investor could consider (2-3 bullets)";

/// Serves AI portfolio commentary through a fingerprint-keyed cache.
///
/// Per-user state machine:
/// `NONE -> (compute) -> SUCCESS | FAILED`;
/// `SUCCESS --(holdings changed)--> recompute`;
/// `FAILED --(any request)--> recompute`.
/// A FAILED record is always retried on the next access — generation
/// failures are treated as transient, so there is no negative caching.
///
/// Only the narrative text is cached. The valuation figures are
/// recomputed from current prices on every request, since prices drift
/// continuously even when holdings don't.
pub struct AnalysisService {
    generator: Arc<dyn CommentaryGenerator>,
    valuation_service: ValuationService,
    options: GenerationOptions,
}

impl AnalysisService {
    pub fn new(generator: Arc<dyn CommentaryGenerator>, ai_settings: &AiSettings) -> Self {
        Self {
            generator,
            valuation_service: ValuationService::new(),
            options: GenerationOptions::from(ai_settings),
        }
    }

    /// Get the analysis for a user, serving cached commentary when the
    /// holdings fingerprint still matches and the last run succeeded,
    /// regenerating otherwise.
    pub async fn get_analysis<S>(
        &self,
        store: &S,
        price_service: &PriceService,
        user_id: u64,
    ) -> Result<AnalysisReport, CoreError>
    where
        S: HoldingsStore + AnalysisStore + PriceStore + ?Sized,
    {
        let holdings = store.load_holdings(user_id).await?;
        let current_fingerprint = fingerprint(&holdings);

        let existing = store.get_analysis(user_id).await?;

        if let Some(record) = &existing {
            if record.fingerprint == current_fingerprint
                && record.status == AnalysisStatus::Success
            {
                if let Some(content) = &record.content {
                    log::info!("analysis cache hit for user {user_id}");
                    let valuation = self.valuate(store, price_service, &holdings).await?;
                    return Ok(AnalysisReport {
                        valuation,
                        commentary: content.clone(),
                        status: AnalysisStatus::Success,
                        from_cache: true,
                    });
                }
            }
            log::info!("analysis cache stale for user {user_id}, regenerating");
        } else {
            log::info!("first analysis for user {user_id}");
        }

        self.regenerate(store, price_service, user_id, &holdings, current_fingerprint)
            .await
    }

    /// Delete the user's cached analysis, forcing full regeneration on
    /// the next access regardless of fingerprint match.
    /// Returns whether a record existed.
    pub async fn clear_cache<S>(&self, store: &S, user_id: u64) -> Result<bool, CoreError>
    where
        S: AnalysisStore + ?Sized,
    {
        let deleted = store.delete_analysis(user_id).await?;
        if deleted {
            log::info!("analysis cache cleared for user {user_id}");
        }
        Ok(deleted)
    }

    /// Run the generator and persist the outcome.
    ///
    /// Success upserts a SUCCESS record with the new content. Failure or
    /// timeout upserts FAILED with no content — partial AI output is
    /// never stored — and the report falls back to a deterministic,
    /// locally-computed summary so the response is never empty.
    async fn regenerate<S>(
        &self,
        store: &S,
        price_service: &PriceService,
        user_id: u64,
        holdings: &[Holding],
        current_fingerprint: String,
    ) -> Result<AnalysisReport, CoreError>
    where
        S: AnalysisStore + PriceStore + ?Sized,
    {
        let valuation = self.valuate(store, price_service, holdings).await?;
        let user_prompt = build_user_prompt(&valuation);

        let generated = tokio::time::timeout(
            self.options.timeout,
            self.generator
                .generate(SYSTEM_PROMPT, &user_prompt, &self.options),
        )
        .await;

        match generated {
            Ok(Ok(content)) if !content.trim().is_empty() => {
                store
                    .upsert_analysis(AnalysisRecord::success(
                        user_id,
                        current_fingerprint,
                        content.clone(),
                    ))
                    .await?;
                log::info!("analysis stored for user {user_id}");
                Ok(AnalysisReport {
                    valuation,
                    commentary: content,
                    status: AnalysisStatus::Success,
                    from_cache: false,
                })
            }
            outcome => {
                match outcome {
                    Ok(Ok(_)) => log::warn!(
                        "{} returned empty commentary for user {user_id}",
                        self.generator.name()
                    ),
                    Ok(Err(e)) => log::warn!(
                        "{} failed for user {user_id}: {e}",
                        self.generator.name()
                    ),
                    Err(_) => log::warn!(
                        "{} timed out after {:?} for user {user_id}",
                        self.generator.name(),
                        self.options.timeout
                    ),
                }

                store
                    .upsert_analysis(AnalysisRecord::failed(user_id, current_fingerprint))
                    .await?;

                Ok(AnalysisReport {
                    commentary: build_fallback_summary(&valuation),
                    valuation,
                    status: AnalysisStatus::Failed,
                    from_cache: false,
                })
            }
        }
    }

    /// One batch price resolution for all held symbols, then pure
    /// valuation. All prices in a report come from this single snapshot.
    async fn valuate<S>(
        &self,
        store: &S,
        price_service: &PriceService,
        holdings: &[Holding],
    ) -> Result<PortfolioValuation, CoreError>
    where
        S: PriceStore + ?Sized,
    {
        let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
        let prices = price_service.get_current_prices(store, &symbols).await?;
        Ok(self.valuation_service.valuate(holdings, &prices))
    }
}

/// Render the valuation as the user prompt for the generator.
fn build_user_prompt(valuation: &PortfolioValuation) -> String {
    let mut prompt = String::from("Analyze the following portfolio data:\n\n");
    prompt.push_str("=== Portfolio data ===\n");
    prompt.push_str(&format!("Total value: {:.2}\n", valuation.total_value));
    prompt.push_str(&format!("Total cost: {:.2}\n", valuation.total_cost));
    prompt.push_str(&format!(
        "Total profit/loss: {:.2} ({}%)\n\n",
        valuation.total_profit_loss, valuation.total_profit_loss_rate
    ));

    prompt.push_str("=== Positions ===\n");
    for position in &valuation.positions {
        prompt.push_str(&format!(
            "- {}: {} units, avg cost {:.2}, current {:.2}, profit/loss {:.2} ({}%)\n",
            position.symbol,
            position.quantity,
            position.average_cost,
            position.current_price,
            position.profit_loss,
            position.profit_loss_rate,
        ));
    }

    if !valuation.missing.is_empty() {
        prompt.push_str(&format!(
            "\nNo current price available for: {} (excluded from the figures above)\n",
            valuation.missing.join(", ")
        ));
    }

    prompt
}

/// Deterministic, locally-computed summary used when generation fails.
/// Built purely from the valuation figures — no AI involved.
fn build_fallback_summary(valuation: &PortfolioValuation) -> String {
    let mut summary = String::from("Portfolio summary\n");
    summary.push_str(&format!(
        "Total value: {:.2}, total cost: {:.2}, profit/loss: {:.2} ({}%)\n",
        valuation.total_value,
        valuation.total_cost,
        valuation.total_profit_loss,
        valuation.total_profit_loss_rate
    ));

    for position in &valuation.positions {
        summary.push_str(&format!(
            "- {}: {} units, avg cost {:.2}, current {:.2}, profit/loss {:.2} ({}%)\n",
            position.symbol,
            position.quantity,
            position.average_cost,
            position.current_price,
            position.profit_loss,
            position.profit_loss_rate,
        ));
    }

    for symbol in &valuation.missing {
        summary.push_str(&format!("- {symbol}: price unavailable\n"));
    }

    summary
}
