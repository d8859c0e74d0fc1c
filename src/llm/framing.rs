//! Incremental line framing over upstream byte chunks.
//!
//! Upstream providers stream SSE over chunked transfer encoding, so a single
//! read may carry several lines or end mid-line. [`LineFramer`] reassembles
//! logical lines: every complete `\n`-terminated line is drained, the
//! trailing partial segment is retained for the next chunk.

/// Buffered `\n` line splitter.
///
/// The buffer only ever holds the trailing partial line, so memory use is
/// bounded by the longest single upstream line.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: String,
}

impl LineFramer {
    /// Create an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it closes.
    ///
    /// Lines are returned without their terminating `\n`. Invalid UTF-8 is
    /// replaced lossily, matching how the upstream body is decoded elsewhere.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let mut line: String = self.buf.drain(..=pos).collect();
            line.pop(); // trailing '\n'
            lines.push(line);
        }
        lines
    }

    /// The retained partial line, if any.
    #[must_use]
    pub fn remainder(&self) -> &str {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lines_drained() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"data: a\ndata: b\n");
        assert_eq!(lines, vec!["data: a", "data: b"]);
        assert_eq!(framer.remainder(), "");
    }

    #[test]
    fn test_partial_line_retained_across_chunks() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"data: {\"delta\":").is_empty());
        assert_eq!(framer.remainder(), "data: {\"delta\":");

        let lines = framer.push(b"\"Hel\"}\ndata: ");
        assert_eq!(lines, vec!["data: {\"delta\":\"Hel\"}"]);
        assert_eq!(framer.remainder(), "data: ");
    }

    #[test]
    fn test_chunk_boundary_inside_multibyte_text() {
        let mut framer = LineFramer::new();
        // "héllo\n" split so the second byte of 'é' arrives separately
        let bytes = "héllo\n".as_bytes();
        let _ = framer.push(&bytes[..2]);
        let lines = framer.push(&bytes[2..]);
        // Lossy decoding may mangle the split scalar but must not lose framing
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("llo"));
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"").is_empty());
        assert_eq!(framer.remainder(), "");
    }

    #[test]
    fn test_many_lines_in_one_chunk_preserve_order() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"1\n2\n3\n4");
        assert_eq!(lines, vec!["1", "2", "3"]);
        assert_eq!(framer.remainder(), "4");
    }
}
