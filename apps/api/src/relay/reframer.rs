//! Turns upstream chunks into client frames.
//!
//! Pure state machine: no I/O, no clock. The driver in `stream.rs` feeds it
//! network chunks and forwards whatever frames come back.

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::relay::events::{classify_upstream_line, ClientEvent, RelayFailure, StreamEvent};
use crate::relay::line_decoder::LineDecoder;
use crate::report::parse_report;

#[derive(Debug, Default)]
pub struct Reframer {
    decoder: LineDecoder,
    /// Every fragment forwarded so far, in arrival order.
    buffer: String,
    fragments: usize,
    finished: bool,
}

impl Reframer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `[DONE]` has been produced. Later input is ignored.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        if self.finished {
            return Vec::new();
        }
        let mut frames = Vec::new();
        for line in self.decoder.feed(chunk) {
            self.handle_line(&line, &mut frames);
            if self.finished {
                break;
            }
        }
        frames
    }

    /// Upstream closed its body. A trailing unterminated line is still
    /// honoured; without a sentinel the stream counts as interrupted.
    pub fn end_of_upstream(&mut self) -> Vec<Bytes> {
        if self.finished {
            return Vec::new();
        }
        let mut frames = Vec::new();
        if let Some(line) = self.decoder.finish() {
            self.handle_line(&line, &mut frames);
        }
        if !self.finished {
            warn!(
                "Upstream closed without a terminal sentinel after {} fragments",
                self.fragments
            );
            frames.extend(self.fail(RelayFailure::transport_interrupted()));
        }
        frames
    }

    /// Ends the client stream with an error frame and `[DONE]`.
    pub fn fail(&mut self, failure: RelayFailure) -> Vec<Bytes> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        vec![
            ClientEvent::Error(&failure).to_frame(),
            ClientEvent::Done.to_frame(),
        ]
    }

    fn handle_line(&mut self, line: &str, frames: &mut Vec<Bytes>) {
        match classify_upstream_line(line) {
            StreamEvent::ContentFragment(text) => {
                frames.push(ClientEvent::Content(&text).to_frame());
                self.buffer.push_str(&text);
                self.fragments += 1;
            }
            StreamEvent::Terminal => self.complete(frames),
            StreamEvent::Malformed(reason) => {
                debug!("Skipping malformed upstream line: {reason}");
            }
            StreamEvent::KeepAlive => {}
        }
    }

    fn complete(&mut self, frames: &mut Vec<Bytes>) {
        match parse_report(&self.buffer) {
            Ok(report) => {
                info!(
                    "Evaluation stream complete: {} fragments, {} chars, overall score {}",
                    self.fragments,
                    self.buffer.len(),
                    report.overall_score
                );
                frames.push(ClientEvent::Report(&report).to_frame());
            }
            Err(e) => {
                warn!(
                    "Final evaluation buffer did not parse ({} chars): {e}",
                    self.buffer.len()
                );
                let failure = RelayFailure::malformed_report();
                frames.push(ClientEvent::Error(&failure).to_frame());
            }
        }
        frames.push(ClientEvent::Done.to_frame());
        self.finished = true;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{"candidateName":"Ana","overallScore":81,"technicalSkillsScore":90,"experienceScore":75,"projectsScore":70,"atsCompatibilityScore":88,"presentationScore":79,"educationScore":60,"strengths":["Rust"],"weaknesses":["Pocas métricas"],"recommendations":["Añadir enlaces"],"technicalAnalysis":"Sólido.","marketComparison":"Competitivo."}"#;

    fn delta(text: &str) -> String {
        let chunk = serde_json::json!({"choices": [{"delta": {"content": text}}]});
        format!("data: {chunk}\n\n")
    }

    fn frames_text(frames: &[Bytes]) -> Vec<String> {
        frames
            .iter()
            .map(|f| String::from_utf8(f.to_vec()).unwrap())
            .collect()
    }

    fn upstream_body(fragments: &[&str]) -> String {
        let mut body = String::from(": keep-alive\n\n");
        for f in fragments {
            body.push_str(&delta(f));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[test]
    fn test_fragments_forwarded_then_report_then_done() {
        let (a, b) = REPORT.split_at(40);
        let mut reframer = Reframer::new();
        let frames = frames_text(&reframer.push_chunk(upstream_body(&[a, b]).as_bytes()));

        assert_eq!(frames.len(), 4);
        assert!(frames[0].starts_with("data: {\"content\":"));
        assert!(frames[1].starts_with("data: {\"content\":"));
        assert!(frames[2].contains("\"candidateName\":\"Ana\""));
        assert!(frames[2].contains("\"overallScore\":81"));
        assert_eq!(frames[3], "data: [DONE]\n\n");
        assert!(reframer.is_finished());
        assert_eq!(reframer.fragments(), 2);
    }

    #[test]
    fn test_byte_at_a_time_gives_same_frames() {
        let body = upstream_body(&[&REPORT[..10], &REPORT[10..55], &REPORT[55..]]);
        let mut whole = Reframer::new();
        let expected = whole.push_chunk(body.as_bytes());

        let mut reframer = Reframer::new();
        let mut frames = Vec::new();
        for byte in body.as_bytes() {
            frames.extend(reframer.push_chunk(std::slice::from_ref(byte)));
        }
        assert_eq!(frames, expected);
    }

    #[test]
    fn test_malformed_lines_do_not_abort() {
        let body = format!(
            "data: {{oops\n\n{}data: not json either\n\n{}data: [DONE]\n\n",
            delta(&REPORT[..30]),
            delta(&REPORT[30..])
        );
        let mut reframer = Reframer::new();
        let frames = frames_text(&reframer.push_chunk(body.as_bytes()));
        assert_eq!(frames.len(), 4);
        assert!(frames[2].contains("\"candidateName\":\"Ana\""));
    }

    #[test]
    fn test_unparseable_buffer_emits_error_then_done() {
        let mut reframer = Reframer::new();
        let frames = frames_text(&reframer.push_chunk(upstream_body(&["{\"candidateName\":"]).as_bytes()));
        assert_eq!(frames.len(), 3);
        assert!(frames[1].contains("MALFORMED_REPORT"));
        assert_eq!(frames[2], "data: [DONE]\n\n");
    }

    #[test]
    fn test_terminal_without_fragments() {
        let mut reframer = Reframer::new();
        let frames = frames_text(&reframer.push_chunk(b"data: [DONE]\n\n"));
        assert_eq!(frames.len(), 2);
        assert!(frames[0].contains("MALFORMED_REPORT"));
    }

    #[test]
    fn test_nothing_after_terminal() {
        let mut reframer = Reframer::new();
        let mut body = upstream_body(&[REPORT]);
        body.push_str(&delta("late"));
        let frames = reframer.push_chunk(body.as_bytes());
        assert_eq!(frames.len(), 3);
        assert!(reframer.push_chunk(delta("later").as_bytes()).is_empty());
        assert!(reframer.end_of_upstream().is_empty());
    }

    #[test]
    fn test_upstream_eof_without_sentinel_is_interrupted() {
        let mut reframer = Reframer::new();
        let frames = reframer.push_chunk(delta(&REPORT[..20]).as_bytes());
        assert_eq!(frames.len(), 1);
        let frames = frames_text(&reframer.end_of_upstream());
        assert_eq!(frames.len(), 2);
        assert!(frames[0].contains("TRANSPORT_INTERRUPTED"));
        assert_eq!(frames[1], "data: [DONE]\n\n");
    }

    #[test]
    fn test_sentinel_without_trailing_newline_still_completes() {
        let mut reframer = Reframer::new();
        let mut body = delta(REPORT);
        body.push_str("data: [DONE]");
        let frames = reframer.push_chunk(body.as_bytes());
        assert_eq!(frames.len(), 1);
        let frames = frames_text(&reframer.end_of_upstream());
        assert_eq!(frames.len(), 2);
        assert!(frames[0].contains("\"overallScore\":81"));
    }

    #[test]
    fn test_fail_is_idempotent() {
        let mut reframer = Reframer::new();
        assert_eq!(reframer.fail(RelayFailure::upstream_timeout()).len(), 2);
        assert!(reframer.fail(RelayFailure::upstream_timeout()).is_empty());
    }
}
