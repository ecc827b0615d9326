use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::traits::{Quote, QuoteProvider};
use crate::errors::CoreError;

const BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance quote provider, via the v8 chart endpoint.
///
/// - **Free**: no API key required; keep requests under ~2/second.
/// - **Data**: the 1-day chart's `meta` block carries the regular-market
///   price, day high/low, and volume.
///
/// First in the default chain.
pub struct YahooFinanceProvider {
    client: Client,
}

impl YahooFinanceProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

impl Default for YahooFinanceProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Yahoo chart API response types ──────────────────────────────────

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "regularMarketDayHigh")]
    regular_market_day_high: Option<f64>,
    #[serde(rename = "regularMarketDayLow")]
    regular_market_day_low: Option<f64>,
    #[serde(rename = "regularMarketVolume")]
    regular_market_volume: Option<u64>,
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let url = format!(
            "{BASE_URL}/v8/finance/chart/{}?interval=1d&range=1d",
            symbol.to_uppercase()
        );

        let resp: ChartResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Failed to parse chart response for {symbol}: {e}"),
            })?;

        let meta = resp
            .chart
            .result
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0).meta)
                }
            })
            .ok_or_else(|| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("No chart result for {symbol}"),
            })?;

        let price = meta
            .regular_market_price
            .and_then(Decimal::from_f64_retain)
            .ok_or_else(|| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("No regular market price for {symbol}"),
            })?;

        Ok(Quote {
            price,
            high: meta.regular_market_day_high.and_then(Decimal::from_f64_retain),
            low: meta.regular_market_day_low.and_then(Decimal::from_f64_retain),
            volume: meta.regular_market_volume,
        })
    }
}
