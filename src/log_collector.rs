//! Decoupled logging pipeline for container builds.
//!
//! # Architecture
//!
//! ```text
//! log::info!() / tool output
//!     |
//! [LogCollector] (non-blocking)
//!     | (crossbeam channel)
//!     v
//! [DiskPersister thread] -> <data dir>/wasm-builder/logs/<timestamp>_build.log
//! ```
//!
//! Console echo happens on the calling thread so interleaving with streamed
//! tool output stays in order. Disk writes never block the caller.
//!
//! The file records everything down to `Debug`; the console level only
//! filters the echo. Without a writable log directory the collector runs
//! console-only.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Target used for raw output lines of external tools.
pub const TOOL_TARGET: &str = "tool";

/// Target used for high-level milestones.
pub const PARSED_TARGET: &str = "parsed";

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV_VAR: &str = "WASM_BUILDER_LOG";

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

/// Lowest level that is always persisted to the session file
const FILE_LEVEL: LevelFilter = LevelFilter::Debug;

/// Per-user logs directory: `<data_local_dir>/wasm-builder/logs`.
///
/// Kept out of the project tree so session logs never end up in the
/// image build context.
pub fn get_global_logs_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("wasm-builder")
        .join("logs")
}

/// Parse a level filter, falling back to `Info`.
pub fn level_from_str(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    /// Log type: "full", "parsed" or "tool"
    pub log_type: String,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(message: String) -> Self {
        Self::typed(message, "full")
    }

    pub fn parsed(message: String) -> Self {
        Self::typed(message, PARSED_TARGET)
    }

    pub fn tool(message: String) -> Self {
        Self::typed(message, TOOL_TARGET)
    }

    fn typed(message: String, log_type: &str) -> Self {
        LogLine {
            message,
            log_type: log_type.to_string(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    /// Format written to disk: `[HH:MM:SS.mmm] message`
    pub fn to_file_line(&self) -> String {
        match self.log_type.as_str() {
            PARSED_TARGET => format!("[{}] ==> {}\n", self.timestamp, self.message),
            _ => format!("[{}] {}\n", self.timestamp, self.message),
        }
    }
}

/// Logger that echoes to the console and persists every line to a session file.
#[derive(Clone)]
pub struct LogCollector {
    /// `None` when running console-only
    tx: Option<Sender<LogMessage>>,
    session_path: Option<PathBuf>,
    console_level: LevelFilter,
}

impl LogCollector {
    /// Create the log directory, open a fresh session file and start the
    /// disk persister thread.
    pub fn new(log_dir: &Path, console_level: LevelFilter) -> Result<Self, String> {
        std::fs::create_dir_all(log_dir)
            .map_err(|e| format!("Failed to create logs directory: {}", e))?;

        let session_path = new_session_path(log_dir);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&session_path)
            .map_err(|e| format!("Failed to open log file {}: {}", session_path.display(), e))?;

        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread, not a tokio task: logging must work before and after the runtime.
        std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let _ = file.write_all(line.to_file_line().as_bytes());
                    }
                    LogMessage::Flush(done) => {
                        let _ = file.flush();
                        let _ = done.send(());
                    }
                }
            }
            let _ = file.flush();
        });

        Ok(LogCollector {
            tx: Some(tx),
            session_path: Some(session_path),
            console_level,
        })
    }

    /// Collector without a session file, used when the log directory is unusable.
    pub fn console_only(console_level: LevelFilter) -> Self {
        LogCollector {
            tx: None,
            session_path: None,
            console_level,
        }
    }

    /// Path of this run's log file, if one is open
    pub fn session_path(&self) -> Option<&Path> {
        self.session_path.as_deref()
    }

    fn file_level(&self) -> LevelFilter {
        if self.tx.is_some() {
            self.console_level.max(FILE_LEVEL)
        } else {
            LevelFilter::Off
        }
    }

    /// Send a log line (non-blocking)
    pub fn log_line(&self, line: LogLine) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(LogMessage::Line(line));
        }
    }

    pub fn log_str(&self, message: impl Into<String>) {
        self.log_line(LogLine::new(message.into()));
    }

    pub fn log_parsed(&self, message: impl Into<String>) {
        self.log_line(LogLine::parsed(message.into()));
    }

    /// Block until every line sent before this call is on disk.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let Some(sender) = &self.tx else {
            return Ok(());
        };
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        sender
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        rx.recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }

    /// Install as the global `log` backend.
    ///
    /// The global max level stays at `Trace`; `enabled` decides per record.
    pub fn install(&self) -> Result<(), String> {
        log::set_boxed_logger(Box::new(self.clone()))
            .map(|()| log::set_max_level(LevelFilter::Trace))
            .map_err(|e| format!("Failed to set global logger: {}", e))
    }

    fn echo_to_console(&self, record: &Record) {
        match record.target() {
            // Tool output is written to the console by the runner itself
            TOOL_TARGET => {}
            PARSED_TARGET => eprintln!("==> {}", record.args()),
            _ if record.level() <= Level::Warn => {
                eprintln!("[{}] {}", record.level(), record.args())
            }
            _ => eprintln!("{}", record.args()),
        }
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target() == TOOL_TARGET
            || metadata.level() <= self.console_level
            || metadata.level() <= self.file_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if record.level() <= self.console_level {
            self.echo_to_console(record);
        }
        if record.target() != TOOL_TARGET && record.level() > self.file_level() {
            return;
        }

        let line = match record.target() {
            TOOL_TARGET => LogLine::tool(record.args().to_string()),
            PARSED_TARGET => LogLine::parsed(record.args().to_string()),
            _ => LogLine::new(format!("[{}] {}", record.level(), record.args())),
        };
        self.log_line(line);
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}

fn new_session_path(log_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("{}_build.log", timestamp))
}
