use async_trait::async_trait;

use crate::errors::CoreError;

/// Outbound notification channel for fired alerts.
///
/// Delivery mechanics (email, SMS, push) live behind this trait in the
/// embedding application; the evaluator only ever calls `send`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user_id: u64, message: &str) -> Result<(), CoreError>;
}

/// Default notifier: writes the notification to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, user_id: u64, message: &str) -> Result<(), CoreError> {
        log::info!("notification for user {user_id}: {message}");
        Ok(())
    }
}
