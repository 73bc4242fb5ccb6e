//! Upstream line classification and client-facing frame encoding.
//!
//! Upstream speaks OpenAI-style SSE (`data: {chunk}` lines ending with
//! `data: [DONE]`). Clients receive the same `data: <json>\n\n` framing with
//! our own payloads: `{"content": ..}` per fragment, the full report or an
//! `{"error": ..}` object at the end, and always a closing `[DONE]`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::report::AssembledReport;

/// Marks the end of both the upstream and the client stream.
pub const DONE_SENTINEL: &str = "[DONE]";
const DATA_FIELD: &str = "data:";

pub const MALFORMED_REPORT: &str = "MALFORMED_REPORT";
pub const UPSTREAM_TIMEOUT: &str = "UPSTREAM_TIMEOUT";
pub const TRANSPORT_INTERRUPTED: &str = "TRANSPORT_INTERRUPTED";

/// One upstream line after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    ContentFragment(String),
    Terminal,
    /// A `data:` payload that is not JSON. Skipped, never fatal.
    Malformed(String),
    /// Blank lines, comments, `event:` lines, and chunks carrying no text.
    KeepAlive,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// Returns the payload of a `data:` line, minus one optional leading space.
pub fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(DATA_FIELD)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

pub fn classify_upstream_line(line: &str) -> StreamEvent {
    let Some(payload) = data_payload(line) else {
        return StreamEvent::KeepAlive;
    };
    if payload.trim() == DONE_SENTINEL {
        return StreamEvent::Terminal;
    }
    if payload.trim().is_empty() {
        return StreamEvent::KeepAlive;
    }
    match serde_json::from_str::<ChatChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
            .filter(|text| !text.is_empty())
            .map(StreamEvent::ContentFragment)
            .unwrap_or(StreamEvent::KeepAlive),
        Err(e) => StreamEvent::Malformed(e.to_string()),
    }
}

/// Failure announced to the client right before the closing `[DONE]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayFailure {
    pub code: String,
    pub message: String,
}

impl RelayFailure {
    pub fn malformed_report() -> Self {
        Self {
            code: MALFORMED_REPORT.to_string(),
            message: "La respuesta de la evaluación no pudo interpretarse".to_string(),
        }
    }

    pub fn upstream_timeout() -> Self {
        Self {
            code: UPSTREAM_TIMEOUT.to_string(),
            message: "El servicio de evaluación dejó de responder".to_string(),
        }
    }

    pub fn transport_interrupted() -> Self {
        Self {
            code: TRANSPORT_INTERRUPTED.to_string(),
            message: "Se interrumpió la conexión con el servicio de evaluación".to_string(),
        }
    }
}

/// One event on the client-facing stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent<'a> {
    Content(&'a str),
    Report(&'a AssembledReport),
    Error(&'a RelayFailure),
    Done,
}

#[derive(Serialize)]
struct ContentPayload<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    error: &'a RelayFailure,
}

impl ClientEvent<'_> {
    /// Encodes as `data: <payload>\n\n`.
    pub fn to_frame(&self) -> Bytes {
        let payload = match self {
            ClientEvent::Content(text) => to_json(&ContentPayload { content: text }),
            ClientEvent::Report(report) => to_json(report),
            ClientEvent::Error(failure) => to_json(&ErrorPayload { error: failure }),
            ClientEvent::Done => DONE_SENTINEL.to_string(),
        };
        Bytes::from(format!("{DATA_FIELD} {payload}\n\n"))
    }
}

// These payloads are plain structs of strings and integers; serialization
// cannot fail.
fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_line(text: &str) -> String {
        let chunk = serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
        });
        format!("data: {chunk}")
    }

    #[test]
    fn test_classifies_content_fragment() {
        assert_eq!(
            classify_upstream_line(&delta_line("{\"candidate")),
            StreamEvent::ContentFragment("{\"candidate".to_string())
        );
    }

    #[test]
    fn test_classifies_terminal() {
        assert_eq!(classify_upstream_line("data: [DONE]"), StreamEvent::Terminal);
        assert_eq!(classify_upstream_line("data:[DONE]"), StreamEvent::Terminal);
    }

    #[test]
    fn test_keep_alives_ignored() {
        for line in ["", ": ping", "event: message", "data: ", "id: 4"] {
            assert_eq!(classify_upstream_line(line), StreamEvent::KeepAlive, "{line:?}");
        }
    }

    #[test]
    fn test_chunk_without_content_is_keep_alive() {
        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(classify_upstream_line(role_only), StreamEvent::KeepAlive);
        let finish = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(classify_upstream_line(finish), StreamEvent::KeepAlive);
        assert_eq!(
            classify_upstream_line(r#"data: {"choices":[]}"#),
            StreamEvent::KeepAlive
        );
    }

    #[test]
    fn test_non_json_payload_is_malformed() {
        assert!(matches!(
            classify_upstream_line("data: {not json"),
            StreamEvent::Malformed(_)
        ));
    }

    #[test]
    fn test_content_frame_escapes_text() {
        let frame = ClientEvent::Content("a\"b\nc").to_frame();
        assert_eq!(&frame[..], b"data: {\"content\":\"a\\\"b\\nc\"}\n\n");
    }

    #[test]
    fn test_error_and_done_frames() {
        let failure = RelayFailure::malformed_report();
        let frame = ClientEvent::Error(&failure).to_frame();
        let text = std::str::from_utf8(&frame).unwrap();
        assert!(text.starts_with("data: {\"error\":{\"code\":\"MALFORMED_REPORT\""));
        assert!(text.ends_with("\n\n"));
        assert_eq!(&ClientEvent::Done.to_frame()[..], b"data: [DONE]\n\n");
    }
}
