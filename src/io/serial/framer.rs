// src/io/serial/framer.rs
//
// Newline framing for the serial byte stream.
// Accumulates partial reads and splits them into raw line records.

/// Default line terminator.
pub const LINE_FEED: u8 = b'\n';

const CARRIAGE_RETURN: u8 = b'\r';

/// Default cap on a single line before it is force-split.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// A line extracted from the serial stream, still undecoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    /// Line bytes without the terminator
    pub bytes: Vec<u8>,
    /// True when the line was cut at `max_length` instead of at a terminator
    pub truncated: bool,
}

/// Stateful line framer for streaming data.
pub struct LineFramer {
    buffer: Vec<u8>,
    delimiter: u8,
    max_length: usize,
}

impl LineFramer {
    /// Create a framer splitting on `\n` with the given length cap.
    pub fn new(max_length: usize) -> Self {
        Self::with_delimiter(LINE_FEED, max_length)
    }

    pub fn with_delimiter(delimiter: u8, max_length: usize) -> Self {
        LineFramer {
            buffer: Vec::with_capacity(max_length.min(DEFAULT_MAX_LINE_LENGTH)),
            delimiter,
            max_length: max_length.max(1),
        }
    }

    /// Feed raw bytes into the framer.
    /// Returns every line completed by this chunk, in arrival order.
    pub fn feed(&mut self, data: &[u8]) -> Vec<RawLine> {
        let mut lines = Vec::new();

        for &byte in data {
            if byte == self.delimiter {
                // Empty lines are still lines; the caller decides whether to echo them
                lines.push(self.take(false));
                continue;
            }

            // A full buffer is only cut when more payload arrives, so a line of
            // exactly max_length bytes still ends at its own terminator
            if self.buffer.len() >= self.max_length && !self.is_cr_before_lf(byte) {
                lines.push(self.take(true));
            }
            self.buffer.push(byte);
        }

        lines
    }

    /// Number of bytes waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial line, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn take(&mut self, truncated: bool) -> RawLine {
        RawLine {
            bytes: std::mem::take(&mut self.buffer),
            truncated,
        }
    }

    /// A CR may ride past the cap when it is the first half of a CRLF.
    fn is_cr_before_lf(&self, byte: u8) -> bool {
        byte == CARRIAGE_RETURN
            && self.delimiter == LINE_FEED
            && self.buffer.last() != Some(&CARRIAGE_RETURN)
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        LineFramer::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_framing() {
        let mut framer = LineFramer::default();

        let lines = framer.feed(b"Voltaje: 3.50 V\r\nsensor offline\n");

        assert_eq!(lines.len(), 2);
        // CR is left in place; decoding strips trailing whitespace
        assert_eq!(lines[0].bytes, b"Voltaje: 3.50 V\r".to_vec());
        assert_eq!(lines[1].bytes, b"sensor offline".to_vec());
        assert!(!lines[0].truncated);
    }

    #[test]
    fn test_partial_reads_are_joined() {
        let mut framer = LineFramer::default();

        assert!(framer.feed(b"Volt").is_empty());
        assert!(framer.feed(b"aje: 5.").is_empty());
        assert_eq!(framer.pending(), 11);

        let lines = framer.feed(b"20 V\nVol");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].bytes, b"Voltaje: 5.20 V".to_vec());
        assert_eq!(framer.pending(), 3);
    }

    #[test]
    fn test_empty_line_is_emitted() {
        let mut framer = LineFramer::default();
        let lines = framer.feed(b"\n\n");
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.bytes.is_empty()));
    }

    #[test]
    fn test_max_length_forces_split() {
        let mut framer = LineFramer::new(5);

        let lines = framer.feed(b"12345678");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].bytes, b"12345".to_vec());
        assert!(lines[0].truncated);
        assert_eq!(framer.pending(), 3);

        let lines = framer.feed(b"\n");
        assert_eq!(lines[0].bytes, b"678".to_vec());
        assert!(!lines[0].truncated);
    }

    #[test]
    fn test_exact_length_line_is_not_split() {
        let mut framer = LineFramer::new(15);

        let lines = framer.feed(b"Voltaje: 3.50 V\nnext\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].bytes, b"Voltaje: 3.50 V".to_vec());
        assert!(!lines[0].truncated);
        assert_eq!(lines[1].bytes, b"next".to_vec());
    }

    #[test]
    fn test_exact_length_line_with_crlf_is_not_split() {
        let mut framer = LineFramer::new(15);

        let lines = framer.feed(b"Voltaje: 3.50 V\r\nnext\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].bytes, b"Voltaje: 3.50 V\r".to_vec());
        assert!(!lines[0].truncated);
        assert_eq!(lines[1].bytes, b"next\r".to_vec());

        // One byte short of the cap plus CRLF
        let lines = framer.feed(b"Voltaje: 3.5 V\r\n");
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].truncated);
    }

    #[test]
    fn test_lone_cr_past_cap_still_splits() {
        let mut framer = LineFramer::new(3);

        let lines = framer.feed(b"abc\r\rd\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].bytes, b"abc\r".to_vec());
        assert!(lines[0].truncated);
        assert_eq!(lines[1].bytes, b"\rd".to_vec());
    }

    #[test]
    fn test_custom_delimiter() {
        let mut framer = LineFramer::with_delimiter(b'\r', 64);
        let lines = framer.feed(b"a\rb\r");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].bytes, b"b".to_vec());
    }

    #[test]
    fn test_reset_drops_partial_line() {
        let mut framer = LineFramer::default();
        framer.feed(b"half a li");
        framer.reset();
        assert_eq!(framer.pending(), 0);
        let lines = framer.feed(b"ne\n");
        assert_eq!(lines[0].bytes, b"ne".to_vec());
    }
}
