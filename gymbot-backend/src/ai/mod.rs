//! Model capability — one stateless `complete` operation against an
//! OpenAI-compatible chat-completions endpoint.
//!
//! Each pipeline stage issues an independent request; no conversation
//! state is retained between calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model endpoint returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },
    #[error("model response contained no completion")]
    Empty,
    #[error("model call timed out after {0}s")]
    Timeout(u64),
}

/// The single operation the pipeline needs from the language model.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AiError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Chat-completions client. One per process; reqwest pools
/// connections internally.
pub struct AiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl AiClient {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ai_timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: config.ai_endpoint.clone(),
            api_key: config.ai_api_key.clone(),
            model: config.ai_model.clone(),
            timeout_secs: config.ai_timeout_secs,
        }
    }
}

#[async_trait]
impl TextCompleter for AiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AiError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout(self.timeout_secs)
                } else {
                    AiError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::Request(format!("invalid completion payload: {}", e)))?;

        completion_text(parsed)
    }
}

/// Pull the first choice's text out of a chat response. A missing
/// choice is a protocol error; empty content is a valid (empty)
/// completion and is left to the caller to interpret.
fn completion_text(response: ChatResponse) -> Result<String, AiError> {
    let choice = response.choices.into_iter().next().ok_or(AiError::Empty)?;
    Ok(choice.message.content.unwrap_or_default().trim().to_string())
}
