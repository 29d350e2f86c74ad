// src/monitor.rs
//
// The read -> extract -> alert loop.
// Single-threaded: the caller raises `stop` (e.g. from a Ctrl-C handler) and
// the loop closes the connection before returning.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::alert::{Alert, Alerter};
use crate::extract::{FieldExtractor, Reading};
use crate::io::serial::{Connector, Line, LineSource};
use crate::io::IoError;
use crate::settings::MonitorSettings;

// ============================================================================
// Reporting
// ============================================================================

/// Receives everything the monitor observes. Routing (console, log file,
/// metrics) is up to the implementor.
pub trait ReportSink {
    fn on_line(&mut self, line: &Line);
    fn on_reading(&mut self, reading: &Reading);
    fn on_alert(&mut self, alert: &Alert);
    fn on_decode_error(&mut self, _error: &IoError) {}
}

/// Result of inspecting a single line.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LineReport {
    pub reading: Option<Reading>,
    /// Only evaluated when a reading was extracted
    pub alert: Option<Alert>,
}

/// Why a `run` returned normally. Fatal errors come back as `Err` instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Stop was raised while a connection was open
    #[default]
    Requested,
    /// Stop was raised before the first open or during a reconnect wait
    RequestedWhileDisconnected,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Requested => f.write_str("stop requested"),
            StopReason::RequestedWhileDisconnected => {
                f.write_str("stop requested while disconnected")
            }
        }
    }
}

/// Counters for one `run`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub lines: u64,
    pub readings: u64,
    pub alerts: u64,
    pub decode_errors: u64,
    pub reconnect_attempts: u32,
    pub stop_reason: StopReason,
}

// ============================================================================
// Monitor
// ============================================================================

pub struct Monitor<C: Connector> {
    connector: C,
    settings: MonitorSettings,
    extractor: FieldExtractor,
    alerter: Alerter,
}

impl<C: Connector> Monitor<C> {
    pub fn new(connector: C, settings: MonitorSettings) -> Result<Self, IoError> {
        settings.validate()?;
        let extractor = FieldExtractor::new(&settings.field_name, &settings.unit);
        let alerter = Alerter::new(settings.alert_threshold_volts);
        Ok(Monitor {
            connector,
            settings,
            extractor,
            alerter,
        })
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Extract and evaluate one line without any I/O.
    pub fn inspect(&self, line: &str) -> LineReport {
        let reading = self.extractor.extract(line);
        let alert = reading.as_ref().and_then(|r| self.alerter.evaluate(r));
        LineReport { reading, alert }
    }

    /// Run until `stop` is raised or an unrecoverable connection error
    /// outlasts the reconnect policy.
    pub fn run<S: ReportSink + ?Sized>(
        &self,
        stop: &AtomicBool,
        sink: &mut S,
    ) -> Result<SessionSummary, IoError> {
        let mut summary = SessionSummary::default();
        let mut source: Option<LineSource<C::Transport>> = None;
        let mut attempt = 0u32;

        while !stop.load(Ordering::SeqCst) {
            if source.is_none() {
                match self.connector.connect(&self.settings.port_settings()) {
                    Ok(conn) => {
                        source = Some(LineSource::new(conn, self.settings.line_source_options()));
                    }
                    Err(e) => {
                        attempt = self.next_attempt(e, attempt, stop, &summary)?;
                        summary.reconnect_attempts += 1;
                        continue;
                    }
                }
            }
            let Some(src) = source.as_mut() else {
                continue;
            };

            match src.next_line() {
                Ok(Some(line)) => {
                    attempt = 0;
                    self.handle_line(&line, sink, &mut summary);
                }
                Ok(None) => {}
                Err(e) if e.is_recoverable() => {
                    summary.decode_errors += 1;
                    tlog!("[monitor] Skipping line: {}", e);
                    sink.on_decode_error(&e);
                }
                Err(e) => {
                    // LineSource already closed the connection
                    source = None;
                    attempt = self.next_attempt(e, attempt, stop, &summary)?;
                    summary.reconnect_attempts += 1;
                }
            }
        }

        summary.stop_reason = match source {
            Some(mut src) => {
                src.close();
                StopReason::Requested
            }
            None => StopReason::RequestedWhileDisconnected,
        };
        tlog!(
            "[monitor] {} after {} lines, {} readings, {} alerts, {} decode errors",
            summary.stop_reason,
            summary.lines,
            summary.readings,
            summary.alerts,
            summary.decode_errors
        );
        Ok(summary)
    }

    fn handle_line<S: ReportSink + ?Sized>(
        &self,
        line: &Line,
        sink: &mut S,
        summary: &mut SessionSummary,
    ) {
        summary.lines += 1;
        sink.on_line(line);

        let report = self.inspect(line.as_str());
        if let Some(reading) = &report.reading {
            summary.readings += 1;
            sink.on_reading(reading);
        }
        if let Some(alert) = &report.alert {
            summary.alerts += 1;
            sink.on_alert(alert);
        }
    }

    /// Either schedule reconnect attempt `attempt + 1` (sleeping its backoff)
    /// or give up with `err`.
    fn next_attempt(
        &self,
        err: IoError,
        attempt: u32,
        stop: &AtomicBool,
        summary: &SessionSummary,
    ) -> Result<u32, IoError> {
        let reconnect = &self.settings.reconnect;
        if attempt >= reconnect.max_attempts {
            tlog!(
                "[monitor] {} (giving up after {} lines, {} readings, {} alerts)",
                err,
                summary.lines,
                summary.readings,
                summary.alerts
            );
            return Err(err);
        }

        let next = attempt + 1;
        let delay = reconnect.delay_for(next);
        tlog!(
            "[monitor] {}; reconnecting in {} ms (attempt {}/{})",
            err,
            delay.as_millis(),
            next,
            reconnect.max_attempts
        );
        self.sleep_unless_stopped(delay, stop);
        Ok(next)
    }

    fn sleep_unless_stopped(&self, delay: Duration, stop: &AtomicBool) {
        let deadline = Instant::now() + delay;
        let slice = self.settings.poll_interval();
        while !stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(slice.min(deadline - now));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
