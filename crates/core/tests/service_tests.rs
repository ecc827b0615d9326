// ═══════════════════════════════════════════════════════════════════
// Service Tests — PriceService, ValuationService, PortfolioService,
// InMemoryStore, StockSentry facade
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stock_sentry_core::ai::traits::{CommentaryGenerator, GenerationOptions};
use stock_sentry_core::errors::CoreError;
use stock_sentry_core::models::holding::Holding;
use stock_sentry_core::models::price::PricePoint;
use stock_sentry_core::models::settings::Settings;
use stock_sentry_core::providers::registry::QuoteProviderRegistry;
use stock_sentry_core::providers::traits::{Quote, QuoteProvider};
use stock_sentry_core::services::notifier::Notifier;
use stock_sentry_core::services::portfolio_service::PortfolioService;
use stock_sentry_core::services::price_service::PriceService;
use stock_sentry_core::services::valuation_service::ValuationService;
use stock_sentry_core::store::memory::InMemoryStore;
use stock_sentry_core::store::traits::{AlertStore, PriceStore};
use stock_sentry_core::StockSentry;

// ═══════════════════════════════════════════════════════════════════
// Mocks
// ═══════════════════════════════════════════════════════════════════

/// Provider returning a fixed price per symbol, counting calls.
struct MockQuoteProvider {
    prices: HashMap<String, Decimal>,
    calls: Arc<AtomicUsize>,
}

impl MockQuoteProvider {
    fn new(prices: &[(&str, Decimal)], calls: Arc<AtomicUsize>) -> Self {
        Self {
            prices: prices
                .iter()
                .map(|(s, p)| (s.to_string(), *p))
                .collect(),
            calls,
        }
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    fn name(&self) -> &str {
        "MockProvider"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .get(symbol)
            .map(|price| Quote {
                price: *price,
                high: None,
                low: None,
                volume: None,
            })
            .ok_or_else(|| CoreError::Api {
                provider: "MockProvider".into(),
                message: format!("no quote for {symbol}"),
            })
    }
}

/// A provider that always fails (for fallback behavior).
struct FailingQuoteProvider {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl QuoteProvider for FailingQuoteProvider {
    fn name(&self) -> &str {
        "FailingMock"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::Api {
            provider: "FailingMock".into(),
            message: format!("simulated failure for {symbol}"),
        })
    }
}

struct MockGenerator;

#[async_trait]
impl CommentaryGenerator for MockGenerator {
    fn name(&self) -> &str {
        "MockGenerator"
    }

    async fn generate(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, CoreError> {
        Ok("mock commentary".to_string())
    }
}

struct MockNotifier;

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, _user_id: u64, _message: &str) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Settings whose live-trading window never matches — providers are
/// always reachable, regardless of when the test runs.
fn settings_market_closed() -> Settings {
    Settings {
        market_open: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        market_close: NaiveTime::from_hms_opt(11, 59, 59).unwrap(),
        ..Settings::default()
    }
}

/// Settings whose live-trading window covers the whole day.
fn settings_market_open() -> Settings {
    Settings {
        market_open: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        market_close: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        ..Settings::default()
    }
}

fn price_service_with(
    providers: Vec<Box<dyn QuoteProvider>>,
    settings: &Settings,
) -> PriceService {
    let mut registry = QuoteProviderRegistry::new();
    for provider in providers {
        registry.register(provider);
    }
    PriceService::new(registry, settings)
}

async fn seed_price(store: &InMemoryStore, symbol: &str, price: Decimal) {
    store
        .append_price(PricePoint::simple(symbol, price, Utc::now()))
        .await
        .unwrap();
}

// ═══════════════════════════════════════════════════════════════════
// PriceService — lookup
// ═══════════════════════════════════════════════════════════════════

mod price_lookup {
    use super::*;

    #[tokio::test]
    async fn history_hit_returns_without_provider_call() {
        let store = InMemoryStore::new();
        seed_price(&store, "AAPL", dec!(150)).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let service = price_service_with(
            vec![Box::new(MockQuoteProvider::new(
                &[("AAPL", dec!(999))],
                Arc::clone(&calls),
            ))],
            &settings_market_closed(),
        );

        let price = service.get_current_price(&store, "AAPL").await.unwrap();
        assert_eq!(price, Some(dec!(150)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_to_second_provider_persists_exactly_one_point() {
        let store = InMemoryStore::new();
        let failing_calls = Arc::new(AtomicUsize::new(0));
        let mock_calls = Arc::new(AtomicUsize::new(0));

        let service = price_service_with(
            vec![
                Box::new(FailingQuoteProvider {
                    calls: Arc::clone(&failing_calls),
                }),
                Box::new(MockQuoteProvider::new(
                    &[("AAPL", dec!(150))],
                    Arc::clone(&mock_calls),
                )),
            ],
            &settings_market_closed(),
        );

        let price = service.get_current_price(&store, "AAPL").await.unwrap();
        assert_eq!(price, Some(dec!(150)));
        assert_eq!(failing_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.price_point_count().await, 1);

        let stored = store.latest_price("AAPL").await.unwrap().unwrap();
        assert_eq!(stored.price, dec!(150));
    }

    #[tokio::test]
    async fn all_providers_fail_returns_none_and_persists_nothing() {
        let store = InMemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let service = price_service_with(
            vec![
                Box::new(FailingQuoteProvider {
                    calls: Arc::clone(&calls),
                }),
                Box::new(FailingQuoteProvider {
                    calls: Arc::clone(&calls),
                }),
            ],
            &settings_market_closed(),
        );

        let price = service.get_current_price(&store, "AAPL").await.unwrap();
        assert_eq!(price, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.price_point_count().await, 0);
    }

    #[tokio::test]
    async fn market_hours_gate_blocks_external_calls_on_history_miss() {
        let store = InMemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let service = price_service_with(
            vec![Box::new(MockQuoteProvider::new(
                &[("AAPL", dec!(150))],
                Arc::clone(&calls),
            ))],
            &settings_market_open(),
        );

        let price = service.get_current_price(&store, "AAPL").await.unwrap();
        assert_eq!(price, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn market_hours_gate_still_serves_history() {
        let store = InMemoryStore::new();
        seed_price(&store, "AAPL", dec!(150)).await;

        let service = price_service_with(Vec::new(), &settings_market_open());
        let price = service.get_current_price(&store, "AAPL").await.unwrap();
        assert_eq!(price, Some(dec!(150)));
    }

    #[tokio::test]
    async fn empty_registry_on_history_miss_is_an_error() {
        let store = InMemoryStore::new();
        let service = price_service_with(Vec::new(), &settings_market_closed());

        let result = service.get_current_price(&store, "AAPL").await;
        assert!(matches!(result, Err(CoreError::NoProvider)));
    }

    #[tokio::test]
    async fn refresh_bypasses_history_and_appends_a_new_point() {
        let store = InMemoryStore::new();
        seed_price(&store, "AAPL", dec!(150)).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let service = price_service_with(
            vec![Box::new(MockQuoteProvider::new(
                &[("AAPL", dec!(155))],
                Arc::clone(&calls),
            ))],
            &settings_market_closed(),
        );

        let price = service.refresh_price(&store, "AAPL").await.unwrap();
        assert_eq!(price, Some(dec!(155)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.price_point_count().await, 2);

        let latest = store.latest_price("AAPL").await.unwrap().unwrap();
        assert_eq!(latest.price, dec!(155));
    }
}

// ═══════════════════════════════════════════════════════════════════
// PriceService — batch resolver
// ═══════════════════════════════════════════════════════════════════

mod batch_resolver {
    use super::*;

    #[tokio::test]
    async fn batch_mixes_history_and_provider_fallback() {
        let store = InMemoryStore::new();
        seed_price(&store, "AAPL", dec!(150)).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let service = price_service_with(
            vec![Box::new(MockQuoteProvider::new(
                &[("MSFT", dec!(400))],
                Arc::clone(&calls),
            ))],
            &settings_market_closed(),
        );

        let symbols = vec!["AAPL".to_string(), "MSFT".to_string()];
        let prices = service.get_current_prices(&store, &symbols).await.unwrap();

        assert_eq!(prices.get("AAPL"), Some(&dec!(150)));
        assert_eq!(prices.get("MSFT"), Some(&dec!(400)));
        // Only MSFT needed the provider.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unresolvable_symbols_are_omitted_never_zeroed() {
        let store = InMemoryStore::new();
        seed_price(&store, "AAPL", dec!(150)).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let service = price_service_with(
            vec![Box::new(FailingQuoteProvider {
                calls: Arc::clone(&calls),
            })],
            &settings_market_closed(),
        );

        let symbols = vec!["AAPL".to_string(), "GHOST".to_string()];
        let prices = service.get_current_prices(&store, &symbols).await.unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices.get("AAPL"), Some(&dec!(150)));
        assert!(!prices.contains_key("GHOST"));
    }

    #[tokio::test]
    async fn empty_symbol_set_is_an_empty_map() {
        let store = InMemoryStore::new();
        let service = price_service_with(Vec::new(), &settings_market_closed());

        let prices = service.get_current_prices(&store, &[]).await.unwrap();
        assert!(prices.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// ValuationService
// ═══════════════════════════════════════════════════════════════════

mod valuation {
    use super::*;

    #[test]
    fn single_holding_arithmetic() {
        let holdings = vec![Holding::new("AAPL", dec!(10), dec!(100))];
        let prices = HashMap::from([("AAPL".to_string(), dec!(150))]);

        let valuation = ValuationService::new().valuate(&holdings, &prices);

        assert_eq!(valuation.positions.len(), 1);
        let position = &valuation.positions[0];
        assert_eq!(position.current_value, dec!(1500));
        assert_eq!(position.cost, dec!(1000));
        assert_eq!(position.profit_loss, dec!(500));
        assert_eq!(position.profit_loss_rate, dec!(50.00));

        assert_eq!(valuation.total_value, dec!(1500));
        assert_eq!(valuation.total_cost, dec!(1000));
        assert_eq!(valuation.total_profit_loss, dec!(500));
        assert_eq!(valuation.total_profit_loss_rate, dec!(50.00));
        assert!(valuation.missing.is_empty());
    }

    #[test]
    fn zero_cost_yields_zero_rate_not_an_error() {
        let holdings = vec![Holding::new("FREE", dec!(10), dec!(0))];
        let prices = HashMap::from([("FREE".to_string(), dec!(5))]);

        let valuation = ValuationService::new().valuate(&holdings, &prices);

        assert_eq!(valuation.positions[0].profit_loss_rate, Decimal::ZERO);
        assert_eq!(valuation.total_profit_loss_rate, Decimal::ZERO);
    }

    #[test]
    fn missing_price_is_flagged_and_excluded_from_totals() {
        let holdings = vec![
            Holding::new("AAPL", dec!(10), dec!(100)),
            Holding::new("GHOST", dec!(5), dec!(50)),
        ];
        let prices = HashMap::from([("AAPL".to_string(), dec!(150))]);

        let valuation = ValuationService::new().valuate(&holdings, &prices);

        assert_eq!(valuation.positions.len(), 1);
        assert_eq!(valuation.missing, vec!["GHOST".to_string()]);
        // Totals cover only priced positions.
        assert_eq!(valuation.total_value, dec!(1500));
        assert_eq!(valuation.total_cost, dec!(1000));
    }

    #[test]
    fn losing_position_has_negative_rate() {
        let holdings = vec![Holding::new("AAPL", dec!(10), dec!(200))];
        let prices = HashMap::from([("AAPL".to_string(), dec!(150))]);

        let valuation = ValuationService::new().valuate(&holdings, &prices);

        assert_eq!(valuation.positions[0].profit_loss, dec!(-500));
        assert_eq!(valuation.positions[0].profit_loss_rate, dec!(-25.00));
    }

    #[test]
    fn empty_holdings_valuate_to_zeroes() {
        let valuation = ValuationService::new().valuate(&[], &HashMap::new());
        assert!(valuation.positions.is_empty());
        assert!(valuation.missing.is_empty());
        assert_eq!(valuation.total_value, Decimal::ZERO);
        assert_eq!(valuation.total_profit_loss_rate, Decimal::ZERO);
    }
}

// ═══════════════════════════════════════════════════════════════════
// PortfolioService — holdings CRUD
// ═══════════════════════════════════════════════════════════════════

mod portfolio {
    use super::*;

    #[tokio::test]
    async fn add_new_holding() {
        let store = InMemoryStore::new();
        let service = PortfolioService::new();

        let holding = service
            .add_holding(&store, 1, "aapl", dec!(10), dec!(100))
            .await
            .unwrap();

        assert_eq!(holding.symbol, "AAPL");
        assert_eq!(holding.quantity, dec!(10));
        assert_eq!(holding.average_cost, dec!(100));
    }

    #[tokio::test]
    async fn repeat_buy_merges_by_weighted_average() {
        let store = InMemoryStore::new();
        let service = PortfolioService::new();

        service
            .add_holding(&store, 1, "AAPL", dec!(10), dec!(100))
            .await
            .unwrap();
        let merged = service
            .add_holding(&store, 1, "AAPL", dec!(10), dec!(200))
            .await
            .unwrap();

        // (100*10 + 200*10) / 20 = 150
        assert_eq!(merged.quantity, dec!(20));
        assert_eq!(merged.average_cost, dec!(150.0000));

        let holdings = stock_sentry_core::store::traits::HoldingsStore::load_holdings(&store, 1)
            .await
            .unwrap();
        assert_eq!(holdings.len(), 1);
    }

    #[tokio::test]
    async fn weighted_average_is_rounded_to_four_places() {
        let store = InMemoryStore::new();
        let service = PortfolioService::new();

        service
            .add_holding(&store, 1, "AAPL", dec!(3), dec!(100))
            .await
            .unwrap();
        let merged = service
            .add_holding(&store, 1, "AAPL", dec!(3), dec!(100.0001))
            .await
            .unwrap();

        // (300 + 300.0003) / 6 = 100.00005 → 100.0001 (half away from zero)
        assert_eq!(merged.average_cost, dec!(100.0001));
    }

    #[tokio::test]
    async fn non_positive_quantity_and_cost_are_rejected() {
        let store = InMemoryStore::new();
        let service = PortfolioService::new();

        for (quantity, cost) in [
            (dec!(0), dec!(100)),
            (dec!(-1), dec!(100)),
            (dec!(10), dec!(0)),
            (dec!(10), dec!(-5)),
        ] {
            let result = service.add_holding(&store, 1, "AAPL", quantity, cost).await;
            assert!(matches!(result, Err(CoreError::Validation(_))));
        }

        // Nothing was persisted.
        let holdings = stock_sentry_core::store::traits::HoldingsStore::load_holdings(&store, 1)
            .await
            .unwrap();
        assert!(holdings.is_empty());
    }

    #[tokio::test]
    async fn update_replaces_without_merging() {
        let store = InMemoryStore::new();
        let service = PortfolioService::new();

        service
            .add_holding(&store, 1, "AAPL", dec!(10), dec!(100))
            .await
            .unwrap();
        let updated = service
            .update_holding(&store, 1, "AAPL", dec!(5), dec!(120))
            .await
            .unwrap();

        assert_eq!(updated.quantity, dec!(5));
        assert_eq!(updated.average_cost, dec!(120));
    }

    #[tokio::test]
    async fn update_and_remove_of_unknown_symbol_fail() {
        let store = InMemoryStore::new();
        let service = PortfolioService::new();

        let update = service
            .update_holding(&store, 1, "AAPL", dec!(5), dec!(120))
            .await;
        assert!(matches!(update, Err(CoreError::NotFound(_))));

        let remove = service.remove_holding(&store, 1, "AAPL").await;
        assert!(matches!(remove, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn remove_deletes_the_position() {
        let store = InMemoryStore::new();
        let service = PortfolioService::new();

        service
            .add_holding(&store, 1, "AAPL", dec!(10), dec!(100))
            .await
            .unwrap();
        service.remove_holding(&store, 1, "AAPL").await.unwrap();

        let holdings = stock_sentry_core::store::traits::HoldingsStore::load_holdings(&store, 1)
            .await
            .unwrap();
        assert!(holdings.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// InMemoryStore — price history and trigger CAS
// ═══════════════════════════════════════════════════════════════════

mod store_behavior {
    use super::*;
    use stock_sentry_core::models::alert::{AlertCondition, PriceAlert};

    #[tokio::test]
    async fn latest_and_previous_follow_timestamps_not_insert_order() {
        let store = InMemoryStore::new();
        let t1 = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 1, 16, 10, 0, 0).unwrap();

        // Inserted newest-first; binary insert restores timestamp order.
        store
            .append_price(PricePoint::simple("AAPL", dec!(150), t2))
            .await
            .unwrap();
        store
            .append_price(PricePoint::simple("AAPL", dec!(140), t1))
            .await
            .unwrap();

        let latest = store.latest_price("AAPL").await.unwrap().unwrap();
        assert_eq!(latest.price, dec!(150));

        let previous = store.previous_price("AAPL").await.unwrap().unwrap();
        assert_eq!(previous.price, dec!(140));
    }

    #[tokio::test]
    async fn previous_price_requires_two_points() {
        let store = InMemoryStore::new();
        seed_price(&store, "AAPL", dec!(150)).await;

        assert!(store.previous_price("AAPL").await.unwrap().is_none());
        assert!(store.previous_price("GHOST").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_triggered_transitions_exactly_once() {
        let store = InMemoryStore::new();
        let alert = PriceAlert::new(1, "AAPL", AlertCondition::Target { price: dec!(100) });
        let id = alert.id;
        store.insert_alert(alert).await.unwrap();

        assert!(store.mark_triggered(id, Utc::now()).await.unwrap());
        // Second attempt loses the CAS.
        assert!(!store.mark_triggered(id, Utc::now()).await.unwrap());

        let active = store.active_alerts().await.unwrap();
        assert!(active.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// StockSentry facade
// ═══════════════════════════════════════════════════════════════════

mod facade {
    use super::*;
    use stock_sentry_core::models::alert::AlertCondition;

    fn build_sentry(store: Arc<InMemoryStore>) -> StockSentry {
        StockSentry::new(
            store,
            Arc::new(MockGenerator),
            Arc::new(MockNotifier),
            settings_market_closed(),
        )
    }

    #[tokio::test]
    async fn portfolio_round_trip() {
        let store = Arc::new(InMemoryStore::new());
        seed_price(&store, "AAPL", dec!(150)).await;
        let sentry = build_sentry(Arc::clone(&store));

        sentry
            .add_holding(1, "AAPL", dec!(10), dec!(100))
            .await
            .unwrap();

        let valuation = sentry.get_portfolio(1).await.unwrap();
        assert_eq!(valuation.total_value, dec!(1500));
        assert_eq!(valuation.total_profit_loss, dec!(500));
        assert_eq!(valuation.total_profit_loss_rate, dec!(50.00));
    }

    #[tokio::test]
    async fn alert_lifecycle_through_facade() {
        let store = Arc::new(InMemoryStore::new());
        seed_price(&store, "AAPL", dec!(101)).await;
        let sentry = build_sentry(Arc::clone(&store));

        let alert = sentry
            .create_alert(1, "AAPL", AlertCondition::Target { price: dec!(100) })
            .await
            .unwrap();

        let fired = sentry.check_alerts().await.unwrap();
        assert_eq!(fired, 1);

        let alerts = sentry.alerts(1).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].triggered);
        assert!(alerts[0].triggered_at.is_some());

        sentry.remove_alert(alert.id).await.unwrap();
        assert!(sentry.alerts(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_alert_conditions_are_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let sentry = build_sentry(store);

        let zero_target = sentry
            .create_alert(1, "AAPL", AlertCondition::Target { price: dec!(0) })
            .await;
        assert!(matches!(zero_target, Err(CoreError::Validation(_))));

        let zero_threshold = sentry
            .create_alert(
                1,
                "AAPL",
                AlertCondition::PercentMove {
                    threshold: dec!(0),
                },
            )
            .await;
        assert!(matches!(zero_threshold, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn default_provider_chain_starts_with_yahoo() {
        let store = Arc::new(InMemoryStore::new());
        let sentry = build_sentry(store);

        let names = sentry.provider_names();
        assert_eq!(names.first().map(String::as_str), Some("Yahoo Finance"));
    }
}
