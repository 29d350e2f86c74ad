// src/io/error.rs
//
// Error type shared by the serial line source, the connector and the monitor.

use thiserror::Error;

/// Errors raised while talking to a serial device.
///
/// Only [`IoError::Decode`] is recoverable: the offending line is skipped and
/// the stream carries on. Everything else ends the current session.
#[derive(Debug, Error)]
pub enum IoError {
    /// The port could not be opened or was lost mid-session.
    #[error("[{device}] connection error: {message}")]
    Connection { device: String, message: String },

    /// A read on an open port failed.
    #[error("[{device}] read error: {message}")]
    Read { device: String, message: String },

    /// A line was not valid UTF-8.
    #[error("[{device}] decode error: {message}")]
    Decode { device: String, message: String },

    /// Attempted use of a connection after it was closed.
    #[error("[{device}] connection is closed")]
    Closed { device: String },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl IoError {
    pub fn connection(device: &str, message: impl Into<String>) -> Self {
        IoError::Connection {
            device: device.to_string(),
            message: message.into(),
        }
    }

    pub fn read(device: &str, message: impl Into<String>) -> Self {
        IoError::Read {
            device: device.to_string(),
            message: message.into(),
        }
    }

    pub fn decode(device: &str, message: impl Into<String>) -> Self {
        IoError::Decode {
            device: device.to_string(),
            message: message.into(),
        }
    }

    pub fn closed(device: &str) -> Self {
        IoError::Closed {
            device: device.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        IoError::Configuration(message.into())
    }

    /// True when the session may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, IoError::Decode { .. })
    }
}
