// src/io/serial/mod.rs
//
// Serial line source for voltwatch.
//
// Features:
// - Connection lifecycle with guaranteed release (close() and Drop)
// - Newline framing over partial reads, with a maximum line length
// - Per-line UTF-8 decoding that never ends the stream on bad bytes

pub mod connection;
pub mod framer;
pub mod reader;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{
    open, Connection, ConnectionState, Connector, PortSettings, SerialConnector, Transport,
};
pub use framer::{LineFramer, RawLine};
pub use reader::{decode_line, Line, LineSource, LineSourceOptions, Lines};
pub use utils::{list_serial_ports, Parity, SerialPortInfo};
