use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::traits::{Quote, QuoteProvider};
use crate::errors::CoreError;

const BASE_URL: &str = "https://api.twelvedata.com";

/// Twelve Data quote provider, via the lightweight `/price` endpoint.
///
/// - **Free tier**: 800 requests/day.
/// - **Requires**: API key (configured under "twelvedata").
/// - **Data**: price only — no intraday high/low/volume on this endpoint.
///
/// Last in the default chain.
pub struct TwelveDataProvider {
    client: Client,
    api_key: String,
}

impl TwelveDataProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }
}

// ── Twelve Data API response types ──────────────────────────────────

#[derive(Deserialize)]
struct PriceResponse {
    price: Option<String>,
    message: Option<String>,
}

#[async_trait]
impl QuoteProvider for TwelveDataProvider {
    fn name(&self) -> &str {
        "Twelve Data"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let resp: PriceResponse = self
            .client
            .get(format!("{BASE_URL}/price"))
            .query(&[("symbol", &symbol.to_uppercase()), ("apikey", &self.api_key)])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Twelve Data".into(),
                message: format!("Failed to parse price response for {symbol}: {e}"),
            })?;

        let price_str = resp.price.ok_or_else(|| CoreError::Api {
            provider: "Twelve Data".into(),
            message: resp
                .message
                .unwrap_or_else(|| format!("No price data for {symbol}")),
        })?;

        let price: Decimal = price_str.parse().map_err(|e| CoreError::Api {
            provider: "Twelve Data".into(),
            message: format!("Invalid price format for {symbol}: {e}"),
        })?;

        Ok(Quote {
            price,
            high: None,
            low: None,
            volume: None,
        })
    }
}
