use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::settings::Settings;
use crate::providers::registry::QuoteProviderRegistry;
use crate::providers::traits::Quote;
use crate::store::traits::PriceStore;

/// Resolves current prices from persisted history with provider fallback.
///
/// Lookup strategy:
/// - Persisted history first. The newest stored point is the current
///   price — no network call at all when history exists.
/// - On a history miss during the live-trading window, give up (`None`):
///   external calls are disabled while the market is open to bound
///   latency and provider quota. The scheduled refresh fills history.
/// - Outside the window, walk the provider chain in priority order and
///   persist whatever the first usable provider returns.
///
/// A missing price is always `None`, never zero — zero is a valid-looking
/// but wrong price that would corrupt valuations and falsely satisfy
/// stop-loss alerts.
pub struct PriceService {
    registry: QuoteProviderRegistry,
    market_tz_offset_hours: i32,
    market_open: NaiveTime,
    market_close: NaiveTime,
}

impl PriceService {
    pub fn new(registry: QuoteProviderRegistry, settings: &Settings) -> Self {
        Self {
            registry,
            market_tz_offset_hours: settings.market_tz_offset_hours,
            market_open: settings.market_open,
            market_close: settings.market_close,
        }
    }

    /// Names of the registered providers, in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.registry.provider_names()
    }

    /// Get the most recent known price for a symbol.
    ///
    /// Returns `Ok(None)` when no price can be determined this cycle;
    /// callers must treat that as "unknown", never as zero.
    pub async fn get_current_price<S>(
        &self,
        store: &S,
        symbol: &str,
    ) -> Result<Option<Decimal>, CoreError>
    where
        S: PriceStore + ?Sized,
    {
        if let Some(point) = store.latest_price(symbol).await? {
            return Ok(Some(point.price));
        }

        log::info!("price history miss for {symbol}");

        // Live-trading window: serve from history only. The miss is left
        // for the background refresh to fill.
        if self.is_market_hours(Utc::now()) {
            log::info!("market hours: external price call disabled for {symbol}");
            return Ok(None);
        }

        self.fetch_and_persist(store, symbol).await
    }

    /// Resolve current prices for a set of symbols in one pass.
    ///
    /// One bulk read covers everything with history; only the leftovers
    /// fall back to per-symbol lookup. Symbols that still cannot be
    /// priced are omitted from the map entirely — callers that want a
    /// substitute value decide that at the call site.
    pub async fn get_current_prices<S>(
        &self,
        store: &S,
        symbols: &[String],
    ) -> Result<HashMap<String, Decimal>, CoreError>
    where
        S: PriceStore + ?Sized,
    {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let latest = store.latest_prices(symbols).await?;
        let mut prices: HashMap<String, Decimal> = latest
            .into_iter()
            .map(|(symbol, point)| (symbol, point.price))
            .collect();

        for symbol in symbols {
            let key = symbol.to_uppercase();
            if prices.contains_key(&key) {
                continue;
            }
            if let Some(price) = self.get_current_price(store, &key).await? {
                prices.insert(key, price);
            }
        }

        Ok(prices)
    }

    /// Force a fresh fetch from the provider chain, bypassing both the
    /// history shortcut and the market-window gate. Used by the bulk
    /// refresh job, which exists precisely to (re)populate history.
    pub async fn refresh_price<S>(
        &self,
        store: &S,
        symbol: &str,
    ) -> Result<Option<Decimal>, CoreError>
    where
        S: PriceStore + ?Sized,
    {
        self.fetch_and_persist(store, symbol).await
    }

    /// Whether `now` falls inside the exchange's live-trading window.
    pub fn is_market_hours(&self, now: DateTime<Utc>) -> bool {
        let Some(offset) = FixedOffset::east_opt(self.market_tz_offset_hours * 3600) else {
            return false;
        };
        let local = now.with_timezone(&offset).time();
        local >= self.market_open && local <= self.market_close
    }

    /// Internal: walk the provider chain, persist the first usable quote.
    ///
    /// Per-provider failures (timeout, malformed response, non-positive
    /// price) mean "try the next provider"; only exhaustion of the whole
    /// chain is a miss.
    async fn fetch_and_persist<S>(
        &self,
        store: &S,
        symbol: &str,
    ) -> Result<Option<Decimal>, CoreError>
    where
        S: PriceStore + ?Sized,
    {
        let Some(quote) = self.fetch_from_chain(symbol).await? else {
            log::warn!("all providers failed for {symbol}");
            return Ok(None);
        };

        let point = PricePoint {
            symbol: symbol.to_uppercase(),
            price: quote.price,
            high: quote.high,
            low: quote.low,
            volume: quote.volume,
            timestamp: Utc::now(),
        };
        store.append_price(point).await?;

        Ok(Some(quote.price))
    }

    async fn fetch_from_chain(&self, symbol: &str) -> Result<Option<Quote>, CoreError> {
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider);
        }

        for provider in self.registry.providers() {
            match provider.fetch_quote(symbol).await {
                Ok(quote) if quote.price > Decimal::ZERO => {
                    return Ok(Some(quote));
                }
                Ok(quote) => {
                    log::warn!(
                        "{} returned unusable price {} for {symbol}, trying next provider",
                        provider.name(),
                        quote.price
                    );
                }
                Err(e) => {
                    log::warn!(
                        "{} failed for {symbol}: {e}, trying next provider",
                        provider.name()
                    );
                }
            }
        }

        Ok(None)
    }
}
