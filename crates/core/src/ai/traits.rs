use async_trait::async_trait;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::settings::AiSettings;

/// Per-call generation parameters.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,

    /// Transport-level bound on the call. The analysis service applies its
    /// own `tokio::time::timeout` on top, so a hung connection can never
    /// block a request indefinitely.
    pub timeout: Duration,
}

impl From<&AiSettings> for GenerationOptions {
    fn from(settings: &AiSettings) -> Self {
        Self {
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: settings.timeout,
        }
    }
}

/// The sole AI integration point.
///
/// The core never depends on a specific provider's request/response shape
/// beyond this contract: a prompt goes in, text comes out, errors and
/// timeouts are the caller's to absorb.
#[async_trait]
pub trait CommentaryGenerator: Send + Sync {
    /// Human-readable name of this generator (for logs/errors).
    fn name(&self) -> &str;

    /// Generate commentary text for a prompt.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, CoreError>;
}
