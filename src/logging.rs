// src/logging.rs
//
// Timestamped diagnostics on stderr, optionally mirrored to a log file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::io::IoError;

const LOG_LINK_NAME: &str = "voltwatch.log";

/// Open mirror file; `None` until `init_file_logging` succeeds.
static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

#[doc(hidden)]
pub fn timestamp() -> chrono::format::DelayedFormat<chrono::format::StrftimeItems<'static>> {
    chrono::Local::now().format("%H:%M:%S%.3f")
}

/// Write one already-stamped line to stderr and the mirror file, if any.
#[doc(hidden)]
pub fn emit(line: &str) {
    eprintln!("{}", line);
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(file) = guard.as_mut() {
            let _ = writeln!(file, "{}", line);
        }
    }
}

/// Start mirroring `tlog!` output into `<log_dir>/YYYYmmdd-HHMMSS-voltwatch.log`.
///
/// On Unix a `voltwatch.log` symlink in the same directory is pointed at the
/// newest file. Returns the path of the file that was opened.
pub fn init_file_logging(log_dir: &Path) -> Result<PathBuf, IoError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        IoError::configuration(format!("cannot create log dir {}: {}", log_dir.display(), e))
    })?;

    let file_name = chrono::Local::now()
        .format("%Y%m%d-%H%M%S-voltwatch.log")
        .to_string();
    let log_path = log_dir.join(&file_name);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| {
            IoError::configuration(format!("cannot open {}: {}", log_path.display(), e))
        })?;

    #[cfg(unix)]
    refresh_link(log_dir, &file_name);

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(file);
    }
    emit(&format!("{} [logging] Mirroring to {}", timestamp(), log_path.display()));

    Ok(log_path)
}

#[cfg(unix)]
fn refresh_link(log_dir: &Path, file_name: &str) {
    let link = log_dir.join(LOG_LINK_NAME);
    let _ = std::fs::remove_file(&link);
    if let Err(e) = std::os::unix::fs::symlink(file_name, &link) {
        emit(&format!("{} [logging] No {} link: {}", timestamp(), LOG_LINK_NAME, e));
    }
}

/// Close the mirror file. Safe to call when file logging never started.
pub fn stop_file_logging() {
    let closed = match LOG_FILE.lock() {
        Ok(mut guard) => guard.take().is_some(),
        Err(_) => false,
    };
    if closed {
        emit(&format!("{} [logging] File logging stopped", timestamp()));
    }
}

/// `eprintln!` with a local `HH:MM:SS.mmm` prefix, copied to the log file
/// while file logging is active.
#[macro_export]
macro_rules! tlog {
    ($($arg:tt)*) => {
        $crate::logging::emit(&format!(
            "{} {}",
            $crate::logging::timestamp(),
            format_args!($($arg)*)
        ))
    };
}
