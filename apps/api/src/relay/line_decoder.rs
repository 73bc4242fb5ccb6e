//! Incremental line splitter for chunked byte streams.
//!
//! Contract: `feed` accepts bytes in any chunking and returns every logical
//! line completed by them, in order. A partial line (including a multi-byte
//! UTF-8 character cut in half) stays buffered until a later feed completes
//! it; nothing is dropped at a chunk boundary.

/// Splits on `\n` and strips one trailing `\r` from each line.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            lines.push(self.take_line());
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
        lines
    }

    /// Returns the unterminated tail, if any, once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }

    /// Bytes buffered but not yet part of a complete line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_line(&mut self) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        // Only complete lines reach here, so a split code point has already
        // been reassembled; invalid input degrades to U+FFFD.
        match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}
