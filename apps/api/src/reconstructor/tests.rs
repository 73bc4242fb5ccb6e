use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use futures::stream;

use super::*;
use crate::relay::reframer::Reframer;
use crate::relay::ClientEvent;

fn content(text: &str) -> String {
    String::from_utf8(ClientEvent::Content(text).to_frame().to_vec()).unwrap()
}

const DONE: &str = "data: [DONE]\n\n";

/// Client stream body for the given fragments, ending with `[DONE]`.
fn client_body(fragments: &[&str]) -> String {
    let mut body: String = fragments.iter().map(|f| content(f)).collect();
    body.push_str(DONE);
    body
}

fn run(chunks: &[&[u8]]) -> Outcome {
    let mut reconstructor = StreamReconstructor::new();
    for chunk in chunks {
        if let Some(outcome) = reconstructor.push_chunk(chunk) {
            return outcome;
        }
    }
    reconstructor.finish()
}

/// Small deterministic generator so failures reproduce exactly.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }

    fn score(&mut self) -> u8 {
        self.below(101) as u8
    }

    fn text(&mut self) -> String {
        const WORDS: [&str; 10] = [
            "Rust", "diseño", "métricas", "\"citas\"", "línea\nnueva", "año", "C++", "ñandú",
            "barra\\invertida", "logro 🚀",
        ];
        let n = 1 + self.below(5) as usize;
        (0..n)
            .map(|_| WORDS[self.below(WORDS.len() as u64) as usize])
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn list(&mut self) -> Vec<String> {
        let n = self.below(4) as usize;
        (0..n).map(|_| self.text()).collect()
    }

    fn report(&mut self) -> AssembledReport {
        AssembledReport {
            candidate_name: self.text(),
            overall_score: self.score(),
            technical_skills_score: self.score(),
            experience_score: self.score(),
            projects_score: self.score(),
            ats_compatibility_score: self.score(),
            presentation_score: self.score(),
            education_score: self.score(),
            strengths: self.list(),
            weaknesses: self.list(),
            recommendations: self.list(),
            technical_analysis: self.text(),
            market_comparison: self.text(),
        }
    }

    /// Splits `text` into char-aligned fragments of 1 to 12 bytes or so.
    fn fragments<'a>(&mut self, text: &'a str) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let want = 1 + self.below(12) as usize;
            let cut = rest
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(rest.len()))
                .find(|i| *i >= want)
                .unwrap_or(rest.len());
            let (head, tail) = rest.split_at(cut);
            out.push(head);
            rest = tail;
        }
        out
    }
}

#[test]
fn test_fragments_in_order_parse() {
    let body = client_body(&["{\"candidateName\":\"A", "na\"}"]);
    let report = run(&[body.as_bytes()]).unwrap();
    assert_eq!(report.candidate_name, "Ana");
}

#[test]
fn test_fragments_reversed_are_malformed() {
    let body = client_body(&["na\"}", "{\"candidateName\":\"A"]);
    let err = run(&[body.as_bytes()]).unwrap_err();
    assert!(matches!(err, ReconstructError::MalformedReport(_)));
}

#[test]
fn test_terminal_in_same_chunk_as_fragment() {
    let body = format!("{}{DONE}", content("{\"overallScore\":64}"));
    let report = run(&[body.as_bytes()]).unwrap();
    assert_eq!(report.overall_score, 64);
}

#[test]
fn test_terminal_before_any_json_is_malformed() {
    let err = run(&[DONE.as_bytes()]).unwrap_err();
    assert!(matches!(err, ReconstructError::MalformedReport(_)));

    let body = client_body(&["{\"candidateName\":"]);
    let err = run(&[body.as_bytes()]).unwrap_err();
    assert!(matches!(err, ReconstructError::MalformedReport(_)));
}

#[test]
fn test_relay_error_event_surfaces() {
    let failure = RelayFailure::upstream_timeout();
    let body = format!(
        "{}{}{DONE}",
        content("{\"candidate"),
        String::from_utf8(ClientEvent::Error(&failure).to_frame().to_vec()).unwrap()
    );
    match run(&[body.as_bytes()]).unwrap_err() {
        ReconstructError::Relay { code, .. } => assert_eq!(code, "UPSTREAM_TIMEOUT"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_relay_malformed_signal_maps_to_malformed_report() {
    let failure = RelayFailure::malformed_report();
    let body = format!(
        "{}{}{DONE}",
        content("{\"candidate"),
        String::from_utf8(ClientEvent::Error(&failure).to_frame().to_vec()).unwrap()
    );
    assert!(matches!(
        run(&[body.as_bytes()]).unwrap_err(),
        ReconstructError::MalformedReport(_)
    ));
}

#[test]
fn test_report_event_is_ignored_in_favour_of_buffer() {
    let mut rng = XorShift(7);
    let report = rng.report();
    let decoy = AssembledReport {
        overall_score: 1,
        ..report.clone()
    };
    let json = serde_json::to_string(&report).unwrap();
    let body = format!(
        "{}{}{DONE}",
        content(&json),
        String::from_utf8(ClientEvent::Report(&decoy).to_frame().to_vec()).unwrap()
    );
    assert_eq!(run(&[body.as_bytes()]).unwrap(), report);
}

#[test]
fn test_end_without_done_is_interrupted() {
    let body = content("{\"overallScore\":64}");
    assert!(matches!(
        run(&[body.as_bytes()]).unwrap_err(),
        ReconstructError::TransportInterrupted
    ));
}

#[test]
fn test_done_without_trailing_newline_completes() {
    let body = format!("{}data: [DONE]", content("{\"overallScore\":64}"));
    assert_eq!(run(&[body.as_bytes()]).unwrap().overall_score, 64);
}

#[test]
fn test_progress_counts_fragments_only() {
    let mut reconstructor = StreamReconstructor::new();
    assert!(reconstructor
        .push_chunk(content("{\"candidateName\":").as_bytes())
        .is_none());
    assert!(reconstructor.push_chunk(content("\"Añ").as_bytes()).is_none());
    assert_eq!(
        reconstructor.progress(),
        Progress {
            fragments: 2,
            bytes: "{\"candidateName\":".len() + "\"Añ".len()
        }
    );
    assert!(!reconstructor.is_finished());
}

#[test]
fn test_nothing_after_done() {
    let mut reconstructor = StreamReconstructor::new();
    let body = client_body(&["{\"overallScore\":5}"]);
    assert!(reconstructor.push_chunk(body.as_bytes()).is_some());
    assert!(reconstructor.is_finished());
    assert!(reconstructor
        .push_chunk(client_body(&["{}"]).as_bytes())
        .is_none());
}

#[test]
fn test_every_single_split_reconstructs_generated_reports() {
    let mut rng = XorShift(0x5eed_1234_abcd_0001);
    for _ in 0..8 {
        let report = rng.report();
        let json = serde_json::to_string(&report).unwrap();
        let fragments = rng.fragments(&json);
        let body = client_body(&fragments);
        let bytes = body.as_bytes();

        for cut in 0..=bytes.len() {
            let outcome = run(&[&bytes[..cut], &bytes[cut..]]);
            assert_eq!(outcome.unwrap(), report, "cut at {cut}");
        }
    }
}

#[test]
fn test_split_pairs_reconstruct_generated_reports() {
    let mut rng = XorShift(0xdead_beef_0042);
    for _ in 0..4 {
        let report = rng.report();
        let json = serde_json::to_string(&report).unwrap();
        let fragments = rng.fragments(&json);
        let body = client_body(&fragments);
        let bytes = body.as_bytes();
        let len = bytes.len();

        for _ in 0..400 {
            let a = rng.below(len as u64 + 1) as usize;
            let b = rng.below(len as u64 + 1) as usize;
            let (a, b) = (a.min(b), a.max(b));
            let outcome = run(&[&bytes[..a], &bytes[a..b], &bytes[b..]]);
            assert_eq!(outcome.unwrap(), report, "cuts at {a}, {b}");
        }
    }
}

#[test]
fn test_relay_output_reconstructs_byte_by_byte() {
    let mut rng = XorShift(99);
    let report = rng.report();
    let json = serde_json::to_string(&report).unwrap();

    let mut upstream = String::new();
    for fragment in rng.fragments(&json) {
        let chunk = serde_json::json!({"choices": [{"delta": {"content": fragment}}]});
        upstream.push_str(&format!("data: {chunk}\n\n"));
    }
    upstream.push_str(DONE);

    let mut reframer = Reframer::new();
    let client: Vec<u8> = reframer
        .push_chunk(upstream.as_bytes())
        .iter()
        .flat_map(|frame| frame.to_vec())
        .collect();

    let chunks: Vec<&[u8]> = client.chunks(1).collect();
    assert_eq!(run(&chunks).unwrap(), report);
}

#[tokio::test]
async fn test_reconstruct_reports_progress() {
    let body = client_body(&["{\"candidateName\":", "\"Ana\"}"]);
    let (first, second) = body.split_at(body.find("\n\n").unwrap() + 2);
    let chunks = vec![
        Ok::<_, Infallible>(Bytes::from(first.to_string())),
        Ok(Bytes::from(second.to_string())),
    ];

    let mut seen = Vec::new();
    let report = reconstruct(stream::iter(chunks), None, |p| seen.push(p))
        .await
        .unwrap();
    assert_eq!(report.candidate_name, "Ana");
    assert_eq!(
        seen,
        vec![Progress {
            fragments: 1,
            bytes: "{\"candidateName\":".len()
        }]
    );
}

#[tokio::test]
async fn test_reconstruct_stream_error_is_interrupted() {
    let chunks = vec![
        Ok(Bytes::from(content("{\"a\":"))),
        Err("connection reset".to_string()),
    ];
    let err = reconstruct(stream::iter(chunks), None, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ReconstructError::TransportInterrupted));
}

#[tokio::test(start_paused = true)]
async fn test_reconstruct_idle_timeout() {
    let first = stream::iter(vec![Ok::<_, Infallible>(Bytes::from(content("{")))]);
    let stalled = futures::StreamExt::chain(first, stream::pending());
    let err = reconstruct(stalled, Some(Duration::from_secs(30)), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ReconstructError::Timeout(d) if d == Duration::from_secs(30)));
}
