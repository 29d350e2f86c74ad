// src/io/serial/utils.rs
//
// Shared helpers around the serialport crate: line settings conversion and
// port enumeration.

use serde::{Deserialize, Serialize};
use serialport::{DataBits, Parity as SpParity, SerialPortType, StopBits};

use crate::io::IoError;

// ============================================================================
// Types
// ============================================================================

/// Parity setting for serial port configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    /// Short form used in `8-N-1` style summaries
    pub fn letter(&self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }
}

/// Information about an available serial port
#[derive(Clone, Debug, Serialize)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert our Parity enum to serialport crate's Parity type
pub fn to_serialport_parity(p: Parity) -> SpParity {
    match p {
        Parity::None => SpParity::None,
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
    }
}

/// Convert data bits count to serialport crate's DataBits type
pub fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

/// Convert stop bits count to serialport crate's StopBits type
pub fn to_serialport_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

// ============================================================================
// Port Enumeration
// ============================================================================

/// List available serial ports
///
/// On macOS, filters out /dev/tty.* devices and only shows /dev/cu.* devices.
/// The cu (calling unit) devices are non-blocking and preferred for outgoing connections.
/// The tty (terminal) devices block on open waiting for carrier detect.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, IoError> {
    let ports = serialport::available_ports()
        .map_err(|e| IoError::connection("enumerate", e.to_string()))?;

    Ok(ports
        .into_iter()
        .filter(|p| keep_port(&p.port_name))
        .map(|p| port_info(p.port_name, p.port_type))
        .collect())
}

#[cfg(target_os = "macos")]
fn keep_port(name: &str) -> bool {
    !name.starts_with("/dev/tty.")
}

#[cfg(not(target_os = "macos"))]
fn keep_port(_name: &str) -> bool {
    true
}

fn port_info(port_name: String, port_type: SerialPortType) -> SerialPortInfo {
    let (port_type, manufacturer, product, serial_number, vid, pid) = match port_type {
        SerialPortType::UsbPort(info) => (
            "USB".to_string(),
            info.manufacturer,
            info.product,
            info.serial_number,
            Some(info.vid),
            Some(info.pid),
        ),
        SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None, None, None, None, None),
        SerialPortType::PciPort => ("PCI".to_string(), None, None, None, None, None),
        SerialPortType::Unknown => ("Unknown".to_string(), None, None, None, None, None),
    };
    SerialPortInfo {
        port_name,
        port_type,
        manufacturer,
        product,
        serial_number,
        vid,
        pid,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_default() {
        assert_eq!(Parity::default(), Parity::None);
        assert_eq!(Parity::default().letter(), 'N');
    }

    #[test]
    fn test_to_serialport_parity() {
        assert!(matches!(to_serialport_parity(Parity::None), SpParity::None));
        assert!(matches!(to_serialport_parity(Parity::Odd), SpParity::Odd));
        assert!(matches!(to_serialport_parity(Parity::Even), SpParity::Even));
    }

    #[test]
    fn test_to_serialport_data_bits() {
        assert!(matches!(to_serialport_data_bits(7), DataBits::Seven));
        assert!(matches!(to_serialport_data_bits(8), DataBits::Eight));
        assert!(matches!(to_serialport_data_bits(9), DataBits::Eight)); // default
    }

    #[test]
    fn test_to_serialport_stop_bits() {
        assert!(matches!(to_serialport_stop_bits(2), StopBits::Two));
        assert!(matches!(to_serialport_stop_bits(0), StopBits::One)); // default
    }

    #[test]
    fn test_port_info_unknown() {
        let info = port_info("COM2".to_string(), SerialPortType::Unknown);
        assert_eq!(info.port_type, "Unknown");
        assert!(info.vid.is_none());
    }
}
