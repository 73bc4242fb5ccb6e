use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::LlmConfig;

/// Largest résumé accepted by the upload endpoint (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Largest base64 payload forwarded to the completion API (~7 MB of PDF).
pub const MAX_ENCODED_PAYLOAD_CHARS: usize = 10_000_000;
/// Request body limit for the HTTP layer. Must exceed both ceilings above.
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;

const DEFAULT_LLM_API_URL: &str = "https://apps.abacus.ai/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 90;

/// Size ceilings enforced before any encoding or network work.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_upload_bytes: usize,
    pub max_encoded_payload_chars: usize,
    pub max_request_body_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            max_encoded_payload_chars: MAX_ENCODED_PAYLOAD_CHARS,
            max_request_body_bytes: MAX_REQUEST_BODY_BYTES,
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// The completion API credential is optional at startup: without it the
/// service still serves uploads and exports, and every evaluation fails with
/// a configuration error.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub llm: LlmConfig,
    /// Longest wait for the next upstream chunk before the relay gives up.
    pub stream_idle_timeout: Option<Duration>,
    pub limits: Limits,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let idle_secs = parse_env("STREAM_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?;

        Ok(Config {
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm: LlmConfig {
                api_key: optional_env("ABACUSAI_API_KEY"),
                api_url: optional_env("LLM_API_URL")
                    .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
                model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                max_tokens: parse_env("LLM_MAX_TOKENS", 4000u32)?,
                temperature: parse_env("LLM_TEMPERATURE", 0.1f64)?,
            },
            stream_idle_timeout: (idle_secs > 0).then_some(Duration::from_secs(idle_secs)),
            limits: Limits::default(),
        })
    }
}

/// Reads a variable, treating empty values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
