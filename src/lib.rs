//! Serial line monitor: reads newline-terminated text from a serial port,
//! extracts `Voltaje: <v> V` readings and raises alerts above a threshold.

#[macro_use]
pub mod logging;

pub mod alert;
pub mod extract;
pub mod io;
pub mod monitor;
pub mod settings;

pub use alert::{check, Alert, Alerter};
pub use extract::{extract, FieldExtractor, Reading};
pub use io::serial::{Connection, Connector, Line, LineSource, SerialConnector};
pub use io::IoError;
pub use monitor::{LineReport, Monitor, ReportSink, SessionSummary, StopReason};
pub use settings::MonitorSettings;
