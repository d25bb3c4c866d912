//! NetLogger-format event log.
//!
//! Each event is a single line:
//!
//! ```text
//! ts=2009-04-01T12:30:00.000Z event=glidein.submit glidein.id=7 site.id=2 condor.id=41.0
//! ```
//!
//! Keys are written in insertion order, `None` values are skipped and values
//! containing whitespace are double-quoted.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::types::Timestamp;

/// Format a timestamp the way NetLogger expects (`...T..:..:...mmmZ`).
pub fn format_ts(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone)]
pub struct NetLoggerEvent {
    event: String,
    ts: Timestamp,
    fields: Vec<(String, Option<String>)>,
}

impl NetLoggerEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ts: Utc::now(),
            fields: Vec::new(),
        }
    }

    pub fn with_ts(mut self, ts: Timestamp) -> Self {
        self.ts = ts;
        self
    }

    pub fn put(mut self, key: &str, value: impl ToString) -> Self {
        self.fields.push((key.to_string(), Some(value.to_string())));
        self
    }

    pub fn put_opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        self.fields
            .push((key.to_string(), value.map(|v| v.to_string())));
        self
    }

    pub fn put_time(self, key: &str, value: Option<Timestamp>) -> Self {
        self.put_opt(key, value.map(format_ts))
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Render the event as a single log line (without the trailing newline).
    pub fn to_line(&self) -> String {
        let mut line = format!("ts={} event={}", format_ts(self.ts), self.event);
        for (key, value) in &self.fields {
            let Some(value) = value else { continue };
            if value.chars().any(char::is_whitespace) {
                line.push_str(&format!(" {key}=\"{value}\""));
            } else {
                line.push_str(&format!(" {key}={value}"));
            }
        }
        line
    }
}

/// Append-only NetLogger file. Writes go through tokio's blocking pool and
/// one line is written at a time.
#[derive(Debug)]
pub struct NetLogger {
    path: PathBuf,
    file: Mutex<File>,
}

impl NetLogger {
    /// Open (creating parent directories and the file as needed).
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(File::from_std(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn log(&self, event: &NetLoggerEvent) -> io::Result<()> {
        let mut line = event.to_line();
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
