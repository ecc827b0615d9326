use crate::models::settings::Settings;

use super::alphavantage::AlphaVantageProvider;
use super::traits::QuoteProvider;
use super::twelvedata::TwelveDataProvider;
use super::yahoo::YahooFinanceProvider;

/// Ordered registry of quote providers.
///
/// Registration order is priority order: the price lookup walks the list
/// and the first provider returning a usable quote wins. Providers can be
/// added or reordered without touching the lookup code.
pub struct QuoteProviderRegistry {
    providers: Vec<Box<dyn QuoteProvider>>,
}

impl QuoteProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with the default provider chain.
    ///
    /// Priority: Yahoo Finance (no key required), then Alpha Vantage and
    /// Twelve Data when their API keys are configured.
    pub fn new_with_defaults(settings: &Settings) -> Self {
        let mut registry = Self::new();

        registry.register(Box::new(YahooFinanceProvider::new()));

        if let Some(key) = settings.api_keys.get("alphavantage") {
            registry.register(Box::new(AlphaVantageProvider::new(key.clone())));
        }

        if let Some(key) = settings.api_keys.get("twelvedata") {
            registry.register(Box::new(TwelveDataProvider::new(key.clone())));
        }

        registry
    }

    /// Register a provider at the end of the priority order.
    pub fn register(&mut self, provider: Box<dyn QuoteProvider>) {
        self.providers.push(provider);
    }

    /// All providers in priority order.
    pub fn providers(&self) -> &[Box<dyn QuoteProvider>] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Names of the registered providers, in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}

impl Default for QuoteProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
