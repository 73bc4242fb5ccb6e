//! Stream Reconstructor: the caller side of `POST /api/evaluate`.
//!
//! Accumulates `content` fragments in arrival order and parses the buffer
//! exactly once, at `[DONE]`. Nothing partial is ever handed out as a report;
//! progress is reported as counts only.

use std::fmt::Display;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::relay::events::{data_payload, MALFORMED_REPORT};
use crate::relay::line_decoder::LineDecoder;
use crate::relay::{RelayFailure, DONE_SENTINEL};
use crate::report::{parse_report, AssembledReport, ReportError};

#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("evaluation finished but the report could not be parsed: {0}")]
    MalformedReport(#[from] ReportError),

    #[error("connection closed before the evaluation finished")]
    TransportInterrupted,

    #[error("relay reported {code}: {message}")]
    Relay { code: String, message: String },

    #[error("no data received for {0:?}")]
    Timeout(Duration),
}

/// Counts only; never partial report data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub fragments: usize,
    pub bytes: usize,
}

/// One payload on the client stream, as far as the reconstructor cares.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClientPayload {
    Content { content: String },
    Error { error: RelayFailure },
    /// The relay's own parse of the buffer. Ignored: our buffer is authoritative.
    Other(serde::de::IgnoredAny),
}

pub type Outcome = Result<AssembledReport, ReconstructError>;

#[derive(Debug, Default)]
pub struct StreamReconstructor {
    decoder: LineDecoder,
    buffer: String,
    progress: Progress,
    relay_failure: Option<RelayFailure>,
    finished: bool,
}

impl StreamReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feeds one network chunk. Returns the outcome once, when `[DONE]` is
    /// seen, and `None` before that and after it.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Option<Outcome> {
        if self.finished {
            return None;
        }
        for line in self.decoder.feed(chunk) {
            if let Some(outcome) = self.handle_line(&line) {
                return Some(outcome);
            }
        }
        None
    }

    /// The stream ended. A trailing `[DONE]` without its newline still
    /// counts; otherwise the evaluation was interrupted.
    pub fn finish(mut self) -> Outcome {
        if !self.finished {
            if let Some(line) = self.decoder.finish() {
                if let Some(outcome) = self.handle_line(&line) {
                    return outcome;
                }
            }
        }
        Err(ReconstructError::TransportInterrupted)
    }

    fn handle_line(&mut self, line: &str) -> Option<Outcome> {
        let payload = data_payload(line)?;
        if payload.trim() == DONE_SENTINEL {
            self.finished = true;
            return Some(self.complete());
        }
        match serde_json::from_str::<ClientPayload>(payload) {
            Ok(ClientPayload::Content { content }) => {
                self.progress.fragments += 1;
                self.progress.bytes += content.len();
                self.buffer.push_str(&content);
            }
            Ok(ClientPayload::Error { error }) => {
                warn!("Relay signalled {}: {}", error.code, error.message);
                self.relay_failure = Some(error);
            }
            Ok(ClientPayload::Other(_)) => {}
            Err(e) => debug!("Ignoring unreadable event: {e}"),
        }
        None
    }

    fn complete(&mut self) -> Outcome {
        let buffer = std::mem::take(&mut self.buffer);
        match self.relay_failure.take() {
            Some(failure) if failure.code != MALFORMED_REPORT => Err(ReconstructError::Relay {
                code: failure.code,
                message: failure.message,
            }),
            _ => Ok(parse_report(&buffer)?),
        }
    }
}

/// Drives a client stream to completion.
///
/// Suspends only while waiting for the next chunk. `on_progress` runs after
/// every chunk that added fragments. With `idle_timeout` set, a gap longer
/// than that between chunks ends the evaluation with `Timeout`.
pub async fn reconstruct<S, B, E, F>(
    stream: S,
    idle_timeout: Option<Duration>,
    mut on_progress: F,
) -> Outcome
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    F: FnMut(Progress),
{
    let mut stream = std::pin::pin!(stream);
    let mut reconstructor = StreamReconstructor::new();

    loop {
        let next = match idle_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.next())
                .await
                .map_err(|_| ReconstructError::Timeout(limit))?,
            None => stream.next().await,
        };

        match next {
            Some(Ok(chunk)) => {
                let before = reconstructor.progress();
                if let Some(outcome) = reconstructor.push_chunk(chunk.as_ref()) {
                    return outcome;
                }
                let now = reconstructor.progress();
                if now != before {
                    on_progress(now);
                }
            }
            Some(Err(e)) => {
                warn!("Evaluation stream failed: {e}");
                return Err(ReconstructError::TransportInterrupted);
            }
            None => return reconstructor.finish(),
        }
    }
}

#[cfg(test)]
mod tests;
