use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::alert::PriceAlert;
use crate::models::analysis::AnalysisRecord;
use crate::models::holding::Holding;
use crate::models::price::PricePoint;

use super::traits::{AlertStore, AnalysisStore, HoldingsStore, JobStore, PriceStore};

/// In-memory store implementing the whole persistence surface.
///
/// Used by the test suite and by embedders that don't need durability.
/// Price history per symbol is kept as a timestamp-sorted `Vec`, inserted
/// with binary search (O(log n)), so latest/previous lookups are just the
/// last two elements.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    prices: RwLock<HashMap<String, Vec<PricePoint>>>,
    holdings: RwLock<HashMap<u64, Vec<Holding>>>,
    analyses: RwLock<HashMap<u64, AnalysisRecord>>,
    alerts: RwLock<Vec<PriceAlert>>,
    job_runs: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored price points across all symbols.
    pub async fn price_point_count(&self) -> usize {
        self.prices.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl PriceStore for InMemoryStore {
    async fn latest_price(&self, symbol: &str) -> Result<Option<PricePoint>, CoreError> {
        let prices = self.prices.read().await;
        Ok(prices
            .get(&symbol.to_uppercase())
            .and_then(|points| points.last().cloned()))
    }

    async fn previous_price(&self, symbol: &str) -> Result<Option<PricePoint>, CoreError> {
        let prices = self.prices.read().await;
        Ok(prices.get(&symbol.to_uppercase()).and_then(|points| {
            if points.len() >= 2 {
                Some(points[points.len() - 2].clone())
            } else {
                None
            }
        }))
    }

    async fn latest_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, PricePoint>, CoreError> {
        let prices = self.prices.read().await;
        let mut map = HashMap::new();
        for symbol in symbols {
            let key = symbol.to_uppercase();
            if let Some(point) = prices.get(&key).and_then(|points| points.last()) {
                map.insert(key, point.clone());
            }
        }
        Ok(map)
    }

    async fn append_price(&self, point: PricePoint) -> Result<(), CoreError> {
        let mut prices = self.prices.write().await;
        let points = prices.entry(point.symbol.to_uppercase()).or_default();

        // Binary insert keeps the history sorted by timestamp even when
        // points arrive out of order (e.g. a backfill racing a live fetch).
        let pos = points
            .binary_search_by_key(&point.timestamp, |p| p.timestamp)
            .unwrap_or_else(|pos| pos);
        points.insert(pos, point);
        Ok(())
    }
}

#[async_trait]
impl HoldingsStore for InMemoryStore {
    async fn load_holdings(&self, user_id: u64) -> Result<Vec<Holding>, CoreError> {
        let holdings = self.holdings.read().await;
        Ok(holdings.get(&user_id).cloned().unwrap_or_default())
    }

    async fn upsert_holding(&self, user_id: u64, holding: Holding) -> Result<(), CoreError> {
        let mut holdings = self.holdings.write().await;
        let positions = holdings.entry(user_id).or_default();
        match positions.iter_mut().find(|h| h.symbol == holding.symbol) {
            Some(existing) => *existing = holding,
            None => positions.push(holding),
        }
        Ok(())
    }

    async fn remove_holding(&self, user_id: u64, symbol: &str) -> Result<bool, CoreError> {
        let mut holdings = self.holdings.write().await;
        let Some(positions) = holdings.get_mut(&user_id) else {
            return Ok(false);
        };
        let upper = symbol.to_uppercase();
        let before = positions.len();
        positions.retain(|h| h.symbol != upper);
        Ok(positions.len() < before)
    }

    async fn held_symbols(&self) -> Result<Vec<String>, CoreError> {
        let holdings = self.holdings.read().await;
        let mut symbols: Vec<String> = holdings
            .values()
            .flatten()
            .map(|h| h.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}

#[async_trait]
impl AnalysisStore for InMemoryStore {
    async fn get_analysis(&self, user_id: u64) -> Result<Option<AnalysisRecord>, CoreError> {
        let analyses = self.analyses.read().await;
        Ok(analyses.get(&user_id).cloned())
    }

    async fn upsert_analysis(&self, record: AnalysisRecord) -> Result<(), CoreError> {
        let mut analyses = self.analyses.write().await;
        analyses.insert(record.user_id, record);
        Ok(())
    }

    async fn delete_analysis(&self, user_id: u64) -> Result<bool, CoreError> {
        let mut analyses = self.analyses.write().await;
        Ok(analyses.remove(&user_id).is_some())
    }
}

#[async_trait]
impl AlertStore for InMemoryStore {
    async fn active_alerts(&self) -> Result<Vec<PriceAlert>, CoreError> {
        let alerts = self.alerts.read().await;
        Ok(alerts.iter().filter(|a| !a.triggered).cloned().collect())
    }

    async fn alerts_for_user(&self, user_id: u64) -> Result<Vec<PriceAlert>, CoreError> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_alert(&self, alert: PriceAlert) -> Result<(), CoreError> {
        let mut alerts = self.alerts.write().await;
        alerts.push(alert);
        Ok(())
    }

    async fn remove_alert(&self, id: Uuid) -> Result<bool, CoreError> {
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|a| a.id != id);
        Ok(alerts.len() < before)
    }

    async fn mark_triggered(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, CoreError> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| CoreError::NotFound(format!("alert {id}")))?;

        if alert.triggered {
            return Ok(false);
        }
        alert.triggered = true;
        alert.triggered_at = Some(at);
        Ok(true)
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn last_completed_run(&self, job: &str) -> Result<Option<DateTime<Utc>>, CoreError> {
        let runs = self.job_runs.read().await;
        Ok(runs.get(job).copied())
    }

    async fn record_run(&self, job: &str, at: DateTime<Utc>) -> Result<(), CoreError> {
        let mut runs = self.job_runs.write().await;
        runs.insert(job.to_string(), at);
        Ok(())
    }
}
