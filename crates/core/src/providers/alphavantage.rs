use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::traits::{Quote, QuoteProvider};
use crate::errors::CoreError;

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage quote provider.
///
/// - **Free tier**: 25 requests/day, 5 requests/minute.
/// - **Requires**: API key (configured under "alphavantage").
/// - **Coverage**: 100k+ global equity symbols.
///
/// Second in the default chain — used when Yahoo Finance fails.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "Alpha Vantage"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let resp: GlobalQuoteResponse = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", &symbol.to_uppercase()),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Alpha Vantage".into(),
                message: format!("Failed to parse quote for {symbol}: {e}"),
            })?;

        let quote = resp.global_quote.ok_or_else(|| CoreError::Api {
            provider: "Alpha Vantage".into(),
            message: format!("No quote data for {symbol}. API limit may be exceeded."),
        })?;

        let price: Decimal = quote
            .price
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CoreError::Api {
                provider: "Alpha Vantage".into(),
                message: format!("Empty price for {symbol}"),
            })?
            .parse()
            .map_err(|e| CoreError::Api {
                provider: "Alpha Vantage".into(),
                message: format!("Invalid price format for {symbol}: {e}"),
            })?;

        Ok(Quote {
            price,
            high: quote.high.and_then(|h| h.parse().ok()),
            low: quote.low.and_then(|l| l.parse().ok()),
            volume: quote.volume.and_then(|v| v.parse().ok()),
        })
    }
}
