use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::errors::CoreError;
use crate::services::alert_service::AlertEvaluator;
use crate::services::price_service::PriceService;
use crate::store::traits::{AlertStore, HoldingsStore, JobStore, Store};

/// Job name under which the bulk refresh records its completed runs.
pub const PRICE_REFRESH_JOB: &str = "price_refresh";

/// How often the refresh scheduler checks whether a daily run is due.
const REFRESH_CHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// Periodic price-alert evaluation.
///
/// Runs forever on a fixed period; an iteration that errors is logged and
/// the loop carries on — a transient store or provider failure must never
/// kill the evaluator.
pub struct AlertScheduler;

impl AlertScheduler {
    pub fn spawn(
        store: Arc<dyn Store>,
        price_service: Arc<PriceService>,
        evaluator: Arc<AlertEvaluator>,
        period: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match evaluator.evaluate_all(store.as_ref(), &price_service).await {
                    Ok(0) => {}
                    Ok(fired) => log::info!("alert check complete: {fired} alert(s) fired"),
                    Err(e) => log::error!("alert check failed: {e}"),
                }
            }
        })
    }
}

/// Once-daily bulk refresh of every watched symbol's price.
///
/// The daily guard is the persisted last-completed-run timestamp, read on
/// every tick — not in-memory state, so it survives restarts. A run that
/// was missed because the process was down happens on the first tick of
/// the new day (the interval's first tick fires immediately on spawn).
pub struct PriceRefreshScheduler;

impl PriceRefreshScheduler {
    pub fn spawn(
        store: Arc<dyn Store>,
        price_service: Arc<PriceService>,
        throttle: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REFRESH_CHECK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let last = match store.last_completed_run(PRICE_REFRESH_JOB).await {
                    Ok(last) => last,
                    Err(e) => {
                        log::error!("failed to read last refresh run: {e}");
                        continue;
                    }
                };

                let now = Utc::now();
                let due = last.map_or(true, |t| t.date_naive() < now.date_naive());
                if !due {
                    continue;
                }

                match refresh_watched_symbols(store.as_ref(), &price_service, throttle).await {
                    Ok(refreshed) => {
                        log::info!("bulk price refresh complete: {refreshed} symbol(s)");
                        if let Err(e) = store.record_run(PRICE_REFRESH_JOB, Utc::now()).await {
                            log::error!("failed to record refresh run: {e}");
                        }
                    }
                    // Not recorded as completed — retried on the next tick.
                    Err(e) => log::error!("bulk price refresh failed: {e}"),
                }
            }
        })
    }
}

/// Refresh every symbol that appears in a holding or an active alert.
/// Individual symbol failures are logged and skipped; successive fetches
/// are spaced by `throttle` to respect provider rate limits.
async fn refresh_watched_symbols(
    store: &dyn Store,
    price_service: &PriceService,
    throttle: Duration,
) -> Result<usize, CoreError> {
    let mut symbols = store.held_symbols().await?;
    for alert in store.active_alerts().await? {
        symbols.push(alert.symbol);
    }
    symbols.sort();
    symbols.dedup();

    let mut refreshed = 0;
    for symbol in &symbols {
        match price_service.refresh_price(store, symbol).await {
            Ok(Some(_)) => refreshed += 1,
            Ok(None) => log::warn!("refresh produced no price for {symbol}"),
            Err(e) => log::warn!("refresh failed for {symbol}: {e}"),
        }
        tokio::time::sleep(throttle).await;
    }

    Ok(refreshed)
}
