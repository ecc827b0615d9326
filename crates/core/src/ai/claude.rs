use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::{CommentaryGenerator, GenerationOptions};
use crate::errors::CoreError;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Claude Messages API implementation of [`CommentaryGenerator`].
pub struct ClaudeGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, CoreError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(CoreError::Validation("API key cannot be empty".into()));
        }

        Ok(Self {
            client: Client::new(),
            api_key,
            model: model.into(),
        })
    }
}

// ── Messages API request/response types ─────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[async_trait]
impl CommentaryGenerator for ClaudeGenerator {
    fn name(&self) -> &str {
        "Claude"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, CoreError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system: system_prompt,
            messages: vec![Message {
                role: "user",
                content: user_prompt,
            }],
        };

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .timeout(options.timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Ai {
                provider: "Claude".into(),
                message: format!("API returned {status}: {body}"),
            });
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| CoreError::Ai {
            provider: "Claude".into(),
            message: format!("Failed to parse response: {e}"),
        })?;

        parsed
            .content
            .into_iter()
            .find(|block| block.block_type == "text")
            .and_then(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| CoreError::Ai {
                provider: "Claude".into(),
                message: "Response contained no text content".into(),
            })
    }
}
