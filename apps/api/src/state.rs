use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::CompletionTransport;
use crate::relay::{EvaluationRelay, RelaySettings};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Stateless across requests; each evaluation owns its own stream.
    pub relay: Arc<EvaluationRelay>,
}

impl AppState {
    pub fn new(config: Config, transport: Arc<dyn CompletionTransport>) -> Self {
        let relay = EvaluationRelay::new(
            config.llm.clone(),
            transport,
            RelaySettings {
                max_payload_chars: config.limits.max_encoded_payload_chars,
                idle_timeout: config.stream_idle_timeout,
            },
        );
        Self {
            config,
            relay: Arc::new(relay),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config(api_key: Option<&str>) -> Config {
    use crate::config::Limits;
    use crate::llm_client::LlmConfig;

    Config {
        port: 0,
        rust_log: "debug".to_string(),
        llm: LlmConfig {
            api_key: api_key.map(str::to_string),
            api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4000,
            temperature: 0.1,
        },
        stream_idle_timeout: Some(std::time::Duration::from_secs(5)),
        limits: Limits::default(),
    }
}

#[cfg(test)]
pub(crate) fn test_state(api_key: Option<&str>) -> AppState {
    let transport = Arc::new(crate::relay::testing::ScriptedTransport::default());
    test_state_with(api_key, transport)
}

#[cfg(test)]
pub(crate) fn test_state_with(
    api_key: Option<&str>,
    transport: Arc<crate::relay::testing::ScriptedTransport>,
) -> AppState {
    AppState::new(test_config(api_key), transport)
}
