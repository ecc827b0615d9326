pub mod ai;
pub mod errors;
pub mod models;
pub mod providers;
pub mod scheduler;
pub mod services;
pub mod store;

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use ai::traits::CommentaryGenerator;
use errors::CoreError;
use models::alert::{AlertCondition, PriceAlert};
use models::analysis::AnalysisReport;
use models::holding::Holding;
use models::settings::Settings;
use models::valuation::PortfolioValuation;
use providers::registry::QuoteProviderRegistry;
use scheduler::{AlertScheduler, PriceRefreshScheduler};
use services::alert_service::AlertEvaluator;
use services::analysis_service::AnalysisService;
use services::notifier::Notifier;
use services::portfolio_service::PortfolioService;
use services::price_service::PriceService;
use services::valuation_service::ValuationService;
use store::traits::{AlertStore, HoldingsStore, Store};

/// Main entry point for the Stock Sentry core library.
///
/// Wires the store, quote providers, commentary generator, and notifier
/// together and exposes the operations an HTTP layer would call. All
/// state lives in the store; the facade itself is cheap to share behind
/// an `Arc`.
#[must_use]
pub struct StockSentry {
    store: Arc<dyn Store>,
    price_service: Arc<PriceService>,
    portfolio_service: PortfolioService,
    valuation_service: ValuationService,
    analysis_service: AnalysisService,
    evaluator: Arc<AlertEvaluator>,
    settings: Settings,
}

impl StockSentry {
    pub fn new(
        store: Arc<dyn Store>,
        generator: Arc<dyn CommentaryGenerator>,
        notifier: Arc<dyn Notifier>,
        settings: Settings,
    ) -> Self {
        let registry = QuoteProviderRegistry::new_with_defaults(&settings);
        let price_service = Arc::new(PriceService::new(registry, &settings));
        let analysis_service = AnalysisService::new(generator, &settings.ai);
        let evaluator = Arc::new(AlertEvaluator::new(notifier));

        Self {
            store,
            price_service,
            portfolio_service: PortfolioService::new(),
            valuation_service: ValuationService::new(),
            analysis_service,
            evaluator,
            settings,
        }
    }

    // ── Holdings ────────────────────────────────────────────────────

    /// Record a buy. An existing position in the same symbol is merged
    /// by weighted average; a new symbol opens a position.
    pub async fn add_holding(
        &self,
        user_id: u64,
        symbol: &str,
        quantity: Decimal,
        average_cost: Decimal,
    ) -> Result<Holding, CoreError> {
        self.portfolio_service
            .add_holding(self.store.as_ref(), user_id, symbol, quantity, average_cost)
            .await
    }

    /// Replace a position's quantity and average cost outright.
    pub async fn update_holding(
        &self,
        user_id: u64,
        symbol: &str,
        quantity: Decimal,
        average_cost: Decimal,
    ) -> Result<Holding, CoreError> {
        self.portfolio_service
            .update_holding(self.store.as_ref(), user_id, symbol, quantity, average_cost)
            .await
    }

    /// Remove a position entirely.
    pub async fn remove_holding(&self, user_id: u64, symbol: &str) -> Result<(), CoreError> {
        self.portfolio_service
            .remove_holding(self.store.as_ref(), user_id, symbol)
            .await
    }

    /// Current holdings for a user.
    pub async fn get_holdings(&self, user_id: u64) -> Result<Vec<Holding>, CoreError> {
        self.store.load_holdings(user_id).await
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Valuate a user's portfolio against one consistent price snapshot.
    pub async fn get_portfolio(&self, user_id: u64) -> Result<PortfolioValuation, CoreError> {
        let holdings = self.store.load_holdings(user_id).await?;
        let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
        let prices = self
            .price_service
            .get_current_prices(self.store.as_ref(), &symbols)
            .await?;
        Ok(self.valuation_service.valuate(&holdings, &prices))
    }

    // ── Analysis ────────────────────────────────────────────────────

    /// Portfolio analysis: cached commentary when holdings are unchanged
    /// since the last successful generation, regenerated otherwise. The
    /// numeric figures are always fresh.
    pub async fn get_analysis(&self, user_id: u64) -> Result<AnalysisReport, CoreError> {
        self.analysis_service
            .get_analysis(self.store.as_ref(), &self.price_service, user_id)
            .await
    }

    /// Drop the cached analysis and regenerate immediately.
    pub async fn refresh_analysis(&self, user_id: u64) -> Result<AnalysisReport, CoreError> {
        self.analysis_service
            .clear_cache(self.store.as_ref(), user_id)
            .await?;
        self.get_analysis(user_id).await
    }

    /// Drop the cached analysis without regenerating.
    /// Returns whether a cached record existed.
    pub async fn clear_analysis_cache(&self, user_id: u64) -> Result<bool, CoreError> {
        self.analysis_service
            .clear_cache(self.store.as_ref(), user_id)
            .await
    }

    // ── Prices ──────────────────────────────────────────────────────

    /// Most recent known price for a symbol, or `None` when unknown.
    pub async fn get_current_price(&self, symbol: &str) -> Result<Option<Decimal>, CoreError> {
        self.price_service
            .get_current_price(self.store.as_ref(), symbol)
            .await
    }

    /// Names of the configured quote providers, in priority order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.price_service.provider_names()
    }

    // ── Alerts ──────────────────────────────────────────────────────

    /// Create a price alert for a user.
    pub async fn create_alert(
        &self,
        user_id: u64,
        symbol: &str,
        condition: AlertCondition,
    ) -> Result<PriceAlert, CoreError> {
        match &condition {
            AlertCondition::Target { price } | AlertCondition::StopLoss { price } => {
                if *price <= Decimal::ZERO {
                    return Err(CoreError::Validation(
                        "alert price must be positive".into(),
                    ));
                }
            }
            AlertCondition::PercentMove { threshold } => {
                if threshold.is_zero() {
                    return Err(CoreError::Validation(
                        "percent threshold must be nonzero".into(),
                    ));
                }
            }
        }

        let alert = PriceAlert::new(user_id, symbol, condition);
        self.store.insert_alert(alert.clone()).await?;
        Ok(alert)
    }

    /// All alerts belonging to a user, fired ones included.
    pub async fn alerts(&self, user_id: u64) -> Result<Vec<PriceAlert>, CoreError> {
        self.store.alerts_for_user(user_id).await
    }

    /// Delete an alert. Deleting and recreating is also how a fired
    /// alert is re-armed.
    pub async fn remove_alert(&self, id: Uuid) -> Result<(), CoreError> {
        if !self.store.remove_alert(id).await? {
            return Err(CoreError::NotFound(format!("alert {id}")));
        }
        Ok(())
    }

    /// Run one alert evaluation pass immediately. Returns how many fired.
    pub async fn check_alerts(&self) -> Result<usize, CoreError> {
        self.evaluator
            .evaluate_all(self.store.as_ref(), &self.price_service)
            .await
    }

    // ── Background jobs ─────────────────────────────────────────────

    /// Start the periodic alert evaluator. The task runs until aborted.
    pub fn start_alert_scheduler(&self) -> JoinHandle<()> {
        AlertScheduler::spawn(
            Arc::clone(&self.store),
            Arc::clone(&self.price_service),
            Arc::clone(&self.evaluator),
            self.settings.alert_check_interval,
        )
    }

    /// Start the once-daily bulk price refresh. The task runs until
    /// aborted.
    pub fn start_price_refresh_scheduler(&self) -> JoinHandle<()> {
        PriceRefreshScheduler::spawn(
            Arc::clone(&self.store),
            Arc::clone(&self.price_service),
            self.settings.refresh_throttle,
        )
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
