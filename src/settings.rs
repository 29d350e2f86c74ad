// src/settings.rs
//
// Monitor settings, loaded from TOML with per-field defaults and overridden
// from the command line.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::serial::{LineSourceOptions, Parity, PortSettings};
use crate::io::IoError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MonitorSettings {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default = "default_read_timeout_seconds")]
    pub read_timeout_seconds: f64,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: f64,
    #[serde(default = "default_alert_threshold_volts")]
    pub alert_threshold_volts: f64,
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    #[serde(default = "default_field_name")]
    pub field_name: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

/// Reopen policy after a connection error. `max_attempts = 0` means fail fast.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReconnectSettings {
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

#[cfg(target_os = "windows")]
fn default_port() -> String {
    "COM2".to_string()
}
#[cfg(not(target_os = "windows"))]
fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    2400
}
fn default_data_bits() -> u8 {
    8
}
fn default_stop_bits() -> u8 {
    1
}
fn default_read_timeout_seconds() -> f64 {
    1.0
}
fn default_poll_interval_seconds() -> f64 {
    0.05
}
fn default_alert_threshold_volts() -> f64 {
    crate::alert::DEFAULT_THRESHOLD
}
fn default_max_line_length() -> usize {
    crate::io::serial::framer::DEFAULT_MAX_LINE_LENGTH
}
fn default_field_name() -> String {
    crate::extract::VOLTAGE_FIELD.to_string()
}
fn default_unit() -> String {
    crate::extract::VOLTAGE_UNIT.to_string()
}
fn default_initial_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    5000
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::default(),
            read_timeout_seconds: default_read_timeout_seconds(),
            poll_interval_seconds: default_poll_interval_seconds(),
            alert_threshold_volts: default_alert_threshold_volts(),
            max_line_length: default_max_line_length(),
            field_name: default_field_name(),
            unit: default_unit(),
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ReconnectSettings {
    /// Delay before reconnect attempt `attempt` (1-based): initial * 2^(attempt-1), capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let shift = attempt.saturating_sub(1).min(30);
        let ms = self
            .initial_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// `<config dir>/voltwatch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("voltwatch").join("config.toml"))
}

impl MonitorSettings {
    /// Load settings from `path`, or from the default location when `None`.
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, IoError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(IoError::configuration(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            IoError::configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let settings = Self::from_toml_str(&content)?;
        tlog!("[settings] Loaded {}", path.display());
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, IoError> {
        toml::from_str(content)
            .map_err(|e| IoError::configuration(format!("failed to parse settings: {}", e)))
    }

    pub fn to_toml_string(&self) -> Result<String, IoError> {
        toml::to_string_pretty(self)
            .map_err(|e| IoError::configuration(format!("failed to serialize settings: {}", e)))
    }

    pub fn validate(&self) -> Result<(), IoError> {
        if self.port.trim().is_empty() {
            return Err(IoError::configuration("port must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(IoError::configuration("baud_rate must be greater than 0"));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(IoError::configuration(format!(
                "data_bits must be 5 to 8, got {}",
                self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(IoError::configuration(format!(
                "stop_bits must be 1 or 2, got {}",
                self.stop_bits
            )));
        }
        if !(self.read_timeout_seconds.is_finite() && self.read_timeout_seconds > 0.0) {
            return Err(IoError::configuration(format!(
                "read_timeout_seconds must be a positive number, got {}",
                self.read_timeout_seconds
            )));
        }
        if !(self.poll_interval_seconds.is_finite() && self.poll_interval_seconds > 0.0) {
            return Err(IoError::configuration(format!(
                "poll_interval_seconds must be a positive number, got {}",
                self.poll_interval_seconds
            )));
        }
        if self.poll_interval_seconds > self.read_timeout_seconds {
            return Err(IoError::configuration(format!(
                "poll_interval_seconds ({}) must not exceed read_timeout_seconds ({})",
                self.poll_interval_seconds, self.read_timeout_seconds
            )));
        }
        if !self.alert_threshold_volts.is_finite() {
            return Err(IoError::configuration("alert_threshold_volts must be finite"));
        }
        if self.max_line_length == 0 {
            return Err(IoError::configuration("max_line_length must be greater than 0"));
        }
        if self.field_name.is_empty() || self.unit.is_empty() {
            return Err(IoError::configuration("field_name and unit must not be empty"));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        seconds(self.read_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        seconds(self.poll_interval_seconds)
    }

    pub fn port_settings(&self) -> PortSettings {
        PortSettings {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            parity: self.parity,
            read_timeout: self.read_timeout(),
        }
    }

    pub fn line_source_options(&self) -> LineSourceOptions {
        LineSourceOptions {
            read_timeout: self.read_timeout(),
            poll_interval: self.poll_interval(),
            max_line_length: self.max_line_length,
        }
    }
}

// Out-of-range values are rejected by validate(); fall back to zero rather than panic.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
