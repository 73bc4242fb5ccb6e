use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm_client::{ByteStream, CompletionTransport, EvaluationRequest, LlmConfig, LlmError};
use crate::relay::events::RelayFailure;
use crate::relay::reframer::Reframer;
use crate::upload::EncodedDocument;

/// Client-facing body: `data: ...\n\n` frames ending with `data: [DONE]\n\n`.
pub type ClientStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("completion API credential is not configured")]
    Configuration,

    #[error("encoded payload of {len} chars exceeds the {max} char ceiling")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<LlmError> for RelayError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Api { status, message } => RelayError::Upstream {
                status,
                body: message,
            },
            LlmError::Http(e) => RelayError::Transport(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    pub max_payload_chars: usize,
    /// `None` waits on the upstream for as long as the connection lives.
    pub idle_timeout: Option<Duration>,
}

/// Forwards one encoded résumé to the completion API and re-frames the
/// streamed answer for the client. Holds no per-request state.
pub struct EvaluationRelay {
    llm: LlmConfig,
    transport: Arc<dyn CompletionTransport>,
    settings: RelaySettings,
}

impl EvaluationRelay {
    pub fn new(
        llm: LlmConfig,
        transport: Arc<dyn CompletionTransport>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            llm,
            transport,
            settings,
        }
    }

    /// Checks run before any network work: credential first, then size.
    pub async fn open(
        &self,
        document: EncodedDocument,
        language: &str,
    ) -> Result<ClientStream, RelayError> {
        let api_key = self
            .llm
            .api_key
            .as_deref()
            .ok_or(RelayError::Configuration)?;

        let len = document.data.len();
        if len > self.settings.max_payload_chars {
            return Err(RelayError::PayloadTooLarge {
                len,
                max: self.settings.max_payload_chars,
            });
        }

        info!(
            "Opening evaluation stream for {} ({len} base64 chars, model {})",
            document.filename, self.llm.model
        );
        let request = EvaluationRequest::new(document, language, &self.llm);
        let upstream = self
            .transport
            .open_stream(api_key, &request.to_chat_request())
            .await?;

        Ok(reframe(upstream, self.settings.idle_timeout))
    }
}

struct RelayState {
    upstream: ByteStream,
    reframer: Reframer,
    idle_timeout: Option<Duration>,
}

impl Drop for RelayState {
    fn drop(&mut self) {
        if !self.reframer.is_finished() {
            info!(
                "Client went away after {} fragments; closing upstream connection",
                self.reframer.fragments()
            );
        }
    }
}

impl RelayState {
    /// Waits for the next upstream chunk and returns the frames it produced.
    /// Suspends only here, between network reads.
    async fn step(&mut self) -> Vec<Bytes> {
        let next = match self.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.upstream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!("No upstream data for {limit:?}; abandoning evaluation stream");
                    return self.reframer.fail(RelayFailure::upstream_timeout());
                }
            },
            None => self.upstream.next().await,
        };

        match next {
            Some(Ok(chunk)) => self.reframer.push_chunk(&chunk),
            Some(Err(e)) => {
                warn!("Upstream stream failed mid-response: {e}");
                self.reframer.fail(RelayFailure::transport_interrupted())
            }
            None => self.reframer.end_of_upstream(),
        }
    }
}

/// Lazily drives the upstream body. The returned stream owns the upstream
/// connection: it is released as soon as `[DONE]` is produced or the stream
/// is dropped, whichever comes first.
pub fn reframe(upstream: ByteStream, idle_timeout: Option<Duration>) -> ClientStream {
    let state = RelayState {
        upstream,
        reframer: Reframer::new(),
        idle_timeout,
    };

    let frames = stream::unfold(Some(state), |state| async move {
        let Some(mut state) = state else {
            return None;
        };
        loop {
            let frames = state.step().await;
            if state.reframer.is_finished() {
                debug!("Evaluation stream finished; releasing upstream");
                return Some((frames, None));
            }
            if !frames.is_empty() {
                return Some((frames, Some(state)));
            }
        }
    });

    Box::pin(frames.flat_map(stream::iter))
}
