use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::alert::{AlertCondition, PriceAlert};
use crate::services::notifier::Notifier;
use crate::services::price_service::PriceService;
use crate::store::traits::{AlertStore, PriceStore};

/// Evaluates active price alerts against current prices and fires
/// at-most-once notifications.
///
/// An alert is a one-way latch: ACTIVE → FIRED, never reset here.
/// The triggered flag is persisted BEFORE the notification is dispatched —
/// a crash after persisting loses at worst one notification (delivery is
/// best-effort), while the reverse order could notify twice.
pub struct AlertEvaluator {
    notifier: Arc<dyn Notifier>,
}

impl AlertEvaluator {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Evaluate every active alert once. Returns how many fired.
    ///
    /// Alerts whose price data is unavailable this cycle are skipped
    /// without any state change and retried on the next run.
    pub async fn evaluate_all<S>(
        &self,
        store: &S,
        price_service: &PriceService,
    ) -> Result<usize, CoreError>
    where
        S: AlertStore + PriceStore + ?Sized,
    {
        let alerts = store.active_alerts().await?;
        let mut fired = 0;

        for alert in alerts {
            let Some(current) = price_service.get_current_price(store, &alert.symbol).await?
            else {
                log::info!(
                    "no current price for {}, skipping alert {}",
                    alert.symbol,
                    alert.id
                );
                continue;
            };

            // Only percent-move alerts need the previous point.
            let previous = match alert.condition {
                AlertCondition::PercentMove { .. } => store
                    .previous_price(&alert.symbol)
                    .await?
                    .map(|point| point.price),
                _ => None,
            };

            match alert.condition.is_met(current, previous) {
                Some(true) => {
                    if self.fire(store, &alert, current, previous).await? {
                        fired += 1;
                    }
                }
                Some(false) => {}
                // Not enough data to evaluate (e.g. no previous price yet);
                // retried next cycle.
                None => {
                    log::info!(
                        "insufficient price history for alert {} on {}, skipping",
                        alert.id,
                        alert.symbol
                    );
                }
            }
        }

        Ok(fired)
    }

    /// Persist the trigger, then notify.
    ///
    /// `mark_triggered` reports whether THIS call won the false→true
    /// transition; a lost race (or an alert deleted mid-cycle) fires no
    /// notification. Notification errors are logged and swallowed.
    async fn fire<S>(
        &self,
        store: &S,
        alert: &PriceAlert,
        current: Decimal,
        previous: Option<Decimal>,
    ) -> Result<bool, CoreError>
    where
        S: AlertStore + ?Sized,
    {
        let transitioned = match store.mark_triggered(alert.id, Utc::now()).await {
            Ok(t) => t,
            Err(CoreError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        if !transitioned {
            return Ok(false);
        }

        let message = alert
            .condition
            .fired_message(&alert.symbol, current, previous);
        log::info!("alert {} fired for user {}: {message}", alert.id, alert.user_id);

        if let Err(e) = self.notifier.send(alert.user_id, &message).await {
            log::warn!(
                "notification delivery failed for user {} (alert {}): {e}",
                alert.user_id,
                alert.id
            );
        }

        Ok(true)
    }
}
