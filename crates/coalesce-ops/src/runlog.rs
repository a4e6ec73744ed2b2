//! Append-only, timestamped run log.
//!
//! Every line is kept in memory, written to the log file right away, and
//! mirrored to `tracing`, so an interrupted run still leaves a complete log
//! of what it finished.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use strum::Display;

use coalesce_core::{Error, Result};

/// Timestamp layout of log lines.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator line used around banners.
pub(crate) const RULE: &str = "============================================================";

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One line of the run log.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogRecord {
    /// Render the record the way it appears in the log file.
    pub fn render(&self) -> String {
        format!("[{}] {}", self.timestamp.format(TIMESTAMP_FORMAT), self.message)
    }
}

/// The log of one run.
#[derive(Debug)]
pub struct RunLog {
    path: Option<PathBuf>,
    sink: Option<BufWriter<File>>,
    records: Vec<LogRecord>,
}

impl RunLog {
    /// Open (or create) `path` for appending, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            sink: Some(BufWriter::new(file)),
            records: Vec::new(),
        })
    }

    /// A log that is only kept in memory (and mirrored to `tracing`).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            sink: None,
            records: Vec::new(),
        }
    }

    /// Where the log is written, if anywhere.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All lines so far.
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Messages so far, without timestamps.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.message.as_str())
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    /// Write a banner: rule, title, rule.
    pub fn banner(&mut self, title: &str) {
        self.info(RULE);
        self.info(title);
        self.info(RULE);
    }

    fn push(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => tracing::info!(target: "coalesce", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "coalesce", "{message}"),
            LogLevel::Error => tracing::error!(target: "coalesce", "{message}"),
        }

        let record = LogRecord {
            timestamp: Local::now(),
            level,
            message,
        };

        if let Some(sink) = self.sink.as_mut() {
            let written = writeln!(sink, "{}", record.render()).and_then(|_| sink.flush());
            if let Err(e) = written {
                // Keep running; the in-memory copy still ends up in the report.
                tracing::warn!(
                    target: "coalesce",
                    "Log file {} is no longer writable: {e}",
                    self.path.as_deref().unwrap_or(Path::new("")).display()
                );
                self.sink = None;
            }
        }

        self.records.push(record);
    }
}
