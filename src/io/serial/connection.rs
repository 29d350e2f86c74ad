// src/io/serial/connection.rs
//
// Serial connection lifecycle (Closed -> Open -> Closed).
// A Connection owns its transport exclusively and releases it on close or drop.

use std::io::Read;
use std::time::Duration;

use serialport::SerialPort;

use super::utils::{self, Parity};
use crate::io::IoError;

// ============================================================================
// Transport
// ============================================================================

/// Byte-level access the line source needs from a serial endpoint.
pub trait Transport {
    /// Number of bytes that can be read without waiting.
    fn bytes_pending(&mut self) -> std::io::Result<usize>;

    /// Read up to `buf.len()` bytes. `Ok(0)` means the endpoint went away.
    fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

impl Transport for Box<dyn SerialPort> {
    fn bytes_pending(&mut self) -> std::io::Result<usize> {
        self.bytes_to_read()
            .map(|n| n as usize)
            .map_err(std::io::Error::from)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.read(buf)
    }
}

// ============================================================================
// Port Settings
// ============================================================================

/// Everything needed to open one serial port.
#[derive(Clone, Debug, PartialEq)]
pub struct PortSettings {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    pub read_timeout: Duration,
}

impl PortSettings {
    pub fn new(port: impl Into<String>, baud_rate: u32, read_timeout: Duration) -> Self {
        PortSettings {
            port: port.into(),
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            read_timeout,
        }
    }

    /// `2400 baud (8-N-1)`
    pub fn describe(&self) -> String {
        format!(
            "{} baud ({}-{}-{})",
            self.baud_rate,
            self.data_bits,
            self.parity.letter(),
            self.stop_bits
        )
    }
}

// ============================================================================
// Connection
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// An open serial endpoint. Once closed it cannot be reopened; call
/// [`Connector::connect`] again for a fresh one.
pub struct Connection<T: Transport> {
    device: String,
    baud_rate: u32,
    transport: Option<T>,
}

impl<T: Transport> Connection<T> {
    pub fn new(device: impl Into<String>, baud_rate: u32, transport: T) -> Self {
        Connection {
            device: device.into(),
            baud_rate,
            transport: Some(transport),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn state(&self) -> ConnectionState {
        if self.transport.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Borrow the transport, failing once the connection is closed.
    pub fn transport_mut(&mut self) -> Result<&mut T, IoError> {
        let device = &self.device;
        self.transport
            .as_mut()
            .ok_or_else(|| IoError::closed(device))
    }

    /// Release the transport. Safe to call any number of times.
    /// Returns true if this call performed the Open -> Closed transition.
    pub fn close(&mut self) -> bool {
        match self.transport.take() {
            Some(transport) => {
                drop(transport);
                tlog!("[serial:{}] Closed", self.device);
                true
            }
            None => false,
        }
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens connections. The monitor goes through this so it can reopen a port
/// after a connection error and so tests can substitute in-memory transports.
pub trait Connector {
    type Transport: Transport;

    fn connect(&self, settings: &PortSettings) -> Result<Connection<Self::Transport>, IoError>;
}

/// Connector backed by the serialport crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    type Transport = Box<dyn SerialPort>;

    fn connect(&self, settings: &PortSettings) -> Result<Connection<Self::Transport>, IoError> {
        open(settings)
    }
}

/// Open a serial port with the given settings.
pub fn open(settings: &PortSettings) -> Result<Connection<Box<dyn SerialPort>>, IoError> {
    if settings.port.trim().is_empty() {
        return Err(IoError::configuration("serial port name is empty"));
    }

    let port = serialport::new(&settings.port, settings.baud_rate)
        .data_bits(utils::to_serialport_data_bits(settings.data_bits))
        .stop_bits(utils::to_serialport_stop_bits(settings.stop_bits))
        .parity(utils::to_serialport_parity(settings.parity))
        .timeout(settings.read_timeout)
        .open()
        .map_err(|e| IoError::connection(&settings.port, e.to_string()))?;

    tlog!(
        "[serial:{}] Opened at {}",
        settings.port,
        settings.describe()
    );

    Ok(Connection::new(settings.port.clone(), settings.baud_rate, port))
}

// ============================================================================
// Tests
// ============================================================================
