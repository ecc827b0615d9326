use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::alert::PriceAlert;
use crate::models::analysis::AnalysisRecord;
use crate::models::holding::Holding;
use crate::models::price::PricePoint;

/// Persistence of append-only price history.
///
/// The backing implementation (SQL, document store, in-memory) is
/// irrelevant to the core — services only ever speak these traits.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// The most recent price point for a symbol, if any.
    async fn latest_price(&self, symbol: &str) -> Result<Option<PricePoint>, CoreError>;

    /// The second-most-recent price point for a symbol, if any.
    /// Percent-move alerts compare the current price against this.
    async fn previous_price(&self, symbol: &str) -> Result<Option<PricePoint>, CoreError>;

    /// One bulk read returning, for each requested symbol, only its most
    /// recent price point (distinct-latest-per-symbol). Symbols with no
    /// history are simply absent from the map.
    async fn latest_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, PricePoint>, CoreError>;

    /// Append a freshly observed price point. History is never mutated.
    async fn append_price(&self, point: PricePoint) -> Result<(), CoreError>;
}

/// Persistence of users' holdings.
#[async_trait]
pub trait HoldingsStore: Send + Sync {
    async fn load_holdings(&self, user_id: u64) -> Result<Vec<Holding>, CoreError>;

    /// Insert or replace the position for `holding.symbol`.
    async fn upsert_holding(&self, user_id: u64, holding: Holding) -> Result<(), CoreError>;

    /// Returns `false` when the user held no such symbol.
    async fn remove_holding(&self, user_id: u64, symbol: &str) -> Result<bool, CoreError>;

    /// Distinct symbols held by any user. Feeds the bulk refresh job.
    async fn held_symbols(&self) -> Result<Vec<String>, CoreError>;
}

/// Persistence of per-user analysis records (one record per user).
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn get_analysis(&self, user_id: u64) -> Result<Option<AnalysisRecord>, CoreError>;

    /// Insert or overwrite the user's record. Last write wins — concurrent
    /// regenerations for the same user are an accepted, harmless race.
    async fn upsert_analysis(&self, record: AnalysisRecord) -> Result<(), CoreError>;

    /// Returns `false` when there was no record to delete.
    async fn delete_analysis(&self, user_id: u64) -> Result<bool, CoreError>;
}

/// Persistence of price alerts.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// All alerts with `triggered == false`, across users.
    async fn active_alerts(&self) -> Result<Vec<PriceAlert>, CoreError>;

    async fn alerts_for_user(&self, user_id: u64) -> Result<Vec<PriceAlert>, CoreError>;

    async fn insert_alert(&self, alert: PriceAlert) -> Result<(), CoreError>;

    /// Returns `false` when no alert with this id existed.
    async fn remove_alert(&self, id: Uuid) -> Result<bool, CoreError>;

    /// Atomically flip `triggered` from false to true and stamp
    /// `triggered_at`. Returns `true` only when THIS call performed the
    /// transition — a second caller observing an already-triggered alert
    /// gets `false` and must not notify.
    async fn mark_triggered(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, CoreError>;
}

/// Persistence of background-job bookkeeping.
///
/// Once-daily jobs are guarded by a persisted "last completed run"
/// timestamp read at process start, not by in-memory state that resets
/// on restart.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn last_completed_run(&self, job: &str) -> Result<Option<DateTime<Utc>>, CoreError>;

    async fn record_run(&self, job: &str, at: DateTime<Utc>) -> Result<(), CoreError>;
}

/// The full persistence surface the facade wires together.
pub trait Store:
    PriceStore + HoldingsStore + AnalysisStore + AlertStore + JobStore + Send + Sync
{
}

impl<T> Store for T where
    T: PriceStore + HoldingsStore + AnalysisStore + AlertStore + JobStore + Send + Sync
{
}
