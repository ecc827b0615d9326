use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::CoreError;

/// One quote as returned by an upstream provider.
///
/// Only `price` is guaranteed; intraday detail depends on what the
/// provider's endpoint exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: Decimal,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub volume: Option<u64>,
}

/// Trait abstraction for upstream quote providers.
///
/// Each external API (Yahoo Finance, Alpha Vantage, Twelve Data)
/// implements this trait. Providers are tried in registry order, so an
/// API that stops working or changes costs one replaced implementation —
/// the rest of the codebase is untouched.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch the most recent quote for a symbol.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError>;
}
