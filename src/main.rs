use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use voltwatch::io::serial::list_serial_ports;
use voltwatch::logging::{init_file_logging, stop_file_logging};
use voltwatch::{
    tlog, Alert, IoError, Line, Monitor, MonitorSettings, Reading, ReportSink, SerialConnector,
};

#[derive(Parser)]
#[command(name = "voltwatch")]
#[command(about = "Serial voltage monitor with threshold alerts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read lines from a serial port, extract readings and raise alerts
    Monitor(MonitorArgs),

    /// List available serial ports
    ListPorts {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective settings as TOML
    ShowConfig {
        /// Path to a settings file (default: <config dir>/voltwatch/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct MonitorArgs {
    /// Path to a settings file (default: <config dir>/voltwatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device, e.g. COM2 or /dev/ttyUSB0
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Alert when a reading is strictly above this value
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Maximum wait for one line, in seconds
    #[arg(long)]
    read_timeout: Option<f64>,

    /// Idle sleep between polls, in seconds
    #[arg(long)]
    poll_interval: Option<f64>,

    /// Reconnect attempts after a connection error (0 = fail fast)
    #[arg(long)]
    reconnect: Option<u32>,

    /// Print one JSON object per event instead of plain text
    #[arg(long)]
    json: bool,

    /// Also write diagnostics to a timestamped log file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl MonitorArgs {
    fn apply(&self, settings: &mut MonitorSettings) {
        if let Some(port) = &self.port {
            settings.port = port.clone();
        }
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(threshold) = self.threshold {
            settings.alert_threshold_volts = threshold;
        }
        if let Some(timeout) = self.read_timeout {
            settings.read_timeout_seconds = timeout;
        }
        if let Some(interval) = self.poll_interval {
            settings.poll_interval_seconds = interval;
        }
        if let Some(attempts) = self.reconnect {
            settings.reconnect.max_attempts = attempts;
        }
    }
}

// ============================================================================
// Console output
// ============================================================================

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ConsoleEvent<'a> {
    Line {
        text: &'a str,
    },
    Reading {
        #[serde(flatten)]
        reading: &'a Reading,
    },
    Alert {
        message: String,
        #[serde(flatten)]
        alert: &'a Alert,
    },
    DecodeError {
        message: String,
    },
}

struct ConsoleSink {
    json: bool,
}

impl ConsoleSink {
    fn emit_json(&self, event: &ConsoleEvent<'_>) {
        match serde_json::to_string(event) {
            Ok(text) => println!("{}", text),
            Err(e) => tlog!("[voltwatch] Failed to encode event: {}", e),
        }
    }
}

impl ReportSink for ConsoleSink {
    fn on_line(&mut self, line: &Line) {
        if self.json {
            self.emit_json(&ConsoleEvent::Line { text: line.as_str() });
        } else {
            println!("{}", line);
        }
    }

    fn on_reading(&mut self, reading: &Reading) {
        if self.json {
            self.emit_json(&ConsoleEvent::Reading { reading });
        } else {
            println!("  {} = {} {}", reading.field_name, reading.value, reading.unit);
        }
    }

    fn on_alert(&mut self, alert: &Alert) {
        if self.json {
            self.emit_json(&ConsoleEvent::Alert {
                message: alert.to_string(),
                alert,
            });
        } else {
            println!("  {}", alert);
        }
    }

    fn on_decode_error(&mut self, error: &IoError) {
        if self.json {
            self.emit_json(&ConsoleEvent::DecodeError {
                message: error.to_string(),
            });
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_monitor(args: MonitorArgs) -> Result<()> {
    if let Some(dir) = &args.log_dir {
        init_file_logging(dir).context("Failed to start file logging")?;
    }

    let mut settings = MonitorSettings::load(args.config.as_deref())?;
    args.apply(&mut settings);

    let port = settings.port.clone();
    let monitor = Monitor::new(SerialConnector, settings).context("Invalid settings")?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_signal = stop.clone();
    let port_for_signal = port.clone();
    ctrlc::set_handler(move || {
        // Ctrl+C twice: don't wait for the loop
        if stop_for_signal.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        tlog!("[voltwatch] Interrupt received, closing {}", port_for_signal);
    })
    .context("Failed to set Ctrl+C handler")?;

    let s = monitor.settings();
    tlog!(
        "[voltwatch] Monitoring {} at {} baud, alert above {} {}",
        port,
        s.baud_rate,
        s.alert_threshold_volts,
        s.unit
    );

    let mut sink = ConsoleSink { json: args.json };
    let summary = monitor
        .run(&stop, &mut sink)
        .with_context(|| format!("Monitoring {} failed", port))?;

    tlog!("[voltwatch] {} closed ({}), exiting", port, summary.stop_reason);
    Ok(())
}

fn list_ports(json: bool) -> Result<()> {
    let ports = list_serial_ports()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    for p in ports {
        let mut line = format!("{}\t{}", p.port_name, p.port_type);
        if let (Some(vid), Some(pid)) = (p.vid, p.pid) {
            line.push_str(&format!("\t{:04x}:{:04x}", vid, pid));
        }
        let description: Vec<&str> = [p.manufacturer.as_deref(), p.product.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !description.is_empty() {
            line.push_str(&format!("\t{}", description.join(" ")));
        }
        println!("{}", line);
    }
    Ok(())
}

fn show_config(config: Option<PathBuf>) -> Result<()> {
    let settings = MonitorSettings::load(config.as_deref())?;
    print!("{}", settings.to_toml_string()?);
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor(args) => run_monitor(args),
        Commands::ListPorts { json } => list_ports(json),
        Commands::ShowConfig { config } => show_config(config),
    }
}

fn main() {
    let result = run();
    if let Err(e) = &result {
        tlog!("[voltwatch] Error: {:#}", e);
    }
    stop_file_logging();

    if result.is_err() {
        std::process::exit(1);
    }
}
