/// LLM Client — the single point of entry for all completion API calls.
///
/// ARCHITECTURAL RULE: No other module may call the completion API directly.
/// The relay talks to it through the `CompletionTransport` trait so tests can
/// swap the HTTP layer for canned chunk sequences.
///
/// Every call is a single streamed request. There are no retries: a failed
/// call surfaces to the caller, who re-submits the whole evaluation.
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

pub mod prompts;
pub mod request;

pub use request::{ChatCompletionRequest, EvaluationRequest};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw upstream body, chunked however the network delivers it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// Settings for the external completion API, resolved once at startup.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Bearer credential. `None` means evaluations are unavailable.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Opens one streamed chat-completion call.
///
/// Implementations return only after the upstream answered with a success
/// status; the returned stream owns the connection and releases it on drop.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn open_stream(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<ByteStream, LlmError>;
}

/// reqwest-backed transport for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_url: String,
}

impl LlmClient {
    /// Only the connect phase is bounded here. The body is a long-lived
    /// stream whose idle time is policed by the relay.
    pub fn new(api_url: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl CompletionTransport for LlmClient {
    async fn open_stream(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<ByteStream, LlmError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!("Completion stream opened (status {status})");
        Ok(Box::pin(response.bytes_stream().map_err(LlmError::from)))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
