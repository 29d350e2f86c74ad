// src/io/serial/reader.rs
//
// Line source over a serial connection.
// Polls for pending bytes, frames them on newlines and decodes each line as
// UTF-8. Decode failures are reported per line; transport failures close the
// connection and end the stream.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::connection::{Connection, Transport};
use super::framer::{LineFramer, RawLine, DEFAULT_MAX_LINE_LENGTH};
use crate::io::IoError;

const READ_CHUNK: usize = 256;

// ============================================================================
// Types and Configuration
// ============================================================================

/// One decoded line with trailing whitespace and terminator removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line(String);

impl Line {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Timing and framing knobs for a [`LineSource`].
#[derive(Clone, Debug, PartialEq)]
pub struct LineSourceOptions {
    /// Upper bound on a single `next_line` call
    pub read_timeout: Duration,
    /// Sleep between availability polls when the port is idle
    pub poll_interval: Duration,
    pub max_line_length: usize,
}

impl Default for LineSourceOptions {
    fn default() -> Self {
        LineSourceOptions {
            read_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Decode a framed line as UTF-8, stripping trailing whitespace.
pub fn decode_line(device: &str, raw: RawLine) -> Result<Line, IoError> {
    let text = String::from_utf8(raw.bytes).map_err(|e| {
        IoError::decode(
            device,
            format!(
                "invalid UTF-8 after {} valid bytes",
                e.utf8_error().valid_up_to()
            ),
        )
    })?;
    Ok(Line(text.trim_end().to_string()))
}

// ============================================================================
// Line Source
// ============================================================================

/// Pull-based reader of text lines. Owns its connection for its whole life.
pub struct LineSource<T: Transport> {
    conn: Connection<T>,
    framer: LineFramer,
    ready: VecDeque<RawLine>,
    options: LineSourceOptions,
    buf: Vec<u8>,
}

impl<T: Transport> LineSource<T> {
    pub fn new(conn: Connection<T>, options: LineSourceOptions) -> Self {
        let framer = LineFramer::new(options.max_line_length);
        LineSource {
            conn,
            framer,
            ready: VecDeque::new(),
            options,
            buf: vec![0u8; READ_CHUNK],
        }
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.conn
    }

    pub fn device(&self) -> &str {
        self.conn.device()
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_open()
    }

    /// Next complete line, or `Ok(None)` if none arrived within the read
    /// timeout. Never blocks longer than the read timeout plus one read.
    pub fn next_line(&mut self) -> Result<Option<Line>, IoError> {
        if let Some(raw) = self.ready.pop_front() {
            return self.decode(raw).map(Some);
        }

        let deadline = Instant::now() + self.options.read_timeout;

        loop {
            let transport = self.conn.transport_mut()?;

            let pending = match transport.bytes_pending() {
                Ok(n) => n,
                Err(e) => {
                    let err = IoError::read(self.conn.device(), e.to_string());
                    return Err(self.fail(err));
                }
            };

            if pending > 0 {
                let want = pending.min(self.buf.len());
                match transport.read_chunk(&mut self.buf[..want]) {
                    Ok(0) => {
                        let err = IoError::connection(self.conn.device(), "device disconnected");
                        return Err(self.fail(err));
                    }
                    Ok(n) => {
                        let lines = self.framer.feed(&self.buf[..n]);
                        self.ready.extend(lines);
                        if let Some(raw) = self.ready.pop_front() {
                            return self.decode(raw).map(Some);
                        }
                    }
                    Err(ref e)
                        if matches!(
                            e.kind(),
                            std::io::ErrorKind::TimedOut
                                | std::io::ErrorKind::WouldBlock
                                | std::io::ErrorKind::Interrupted
                        ) => {}
                    Err(e) => {
                        let err = IoError::read(self.conn.device(), e.to_string());
                        return Err(self.fail(err));
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            if pending == 0 {
                std::thread::sleep(self.options.poll_interval.min(deadline - now));
            }
        }
    }

    /// Lazy sequence of lines that ends when `stop` is raised or after the
    /// first unrecoverable error. Idle polls are skipped; decode errors are
    /// yielded and the sequence continues.
    pub fn lines<'a>(&'a mut self, stop: &'a AtomicBool) -> Lines<'a, T> {
        Lines {
            source: self,
            stop,
            finished: false,
        }
    }

    /// Close the underlying connection. Idempotent.
    pub fn close(&mut self) -> bool {
        self.ready.clear();
        self.framer.reset();
        self.conn.close()
    }

    fn decode(&self, raw: RawLine) -> Result<Line, IoError> {
        if raw.truncated {
            tlog!(
                "[serial:{}] Line exceeded {} bytes, split",
                self.conn.device(),
                self.options.max_line_length
            );
        }
        decode_line(self.conn.device(), raw)
    }

    fn fail(&mut self, err: IoError) -> IoError {
        let discarded = self.framer.pending();
        if discarded > 0 {
            tlog!(
                "[serial:{}] Discarding {} bytes of partial line",
                self.conn.device(),
                discarded
            );
        }
        self.close();
        err
    }
}

/// Iterator returned by [`LineSource::lines`].
pub struct Lines<'a, T: Transport> {
    source: &'a mut LineSource<T>,
    stop: &'a AtomicBool,
    finished: bool,
}

impl<T: Transport> Iterator for Lines<'_, T> {
    type Item = Result<Line, IoError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if self.stop.load(Ordering::SeqCst) {
                return None;
            }
            match self.source.next_line() {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => continue,
                Err(e) if e.is_recoverable() => return Some(Err(e)),
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
