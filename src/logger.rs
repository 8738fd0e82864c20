// src/logger.rs
// Run logging to console plus two file sinks (text + JSONL)

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;

use crate::errors::AgentResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// One structured log record, mirrored into the JSONL sink.
#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    timestamp: String,
    level: &'a str,
    message: &'a str,
}

/// Logger for a single agent run.
///
/// Writes every message to the console, to a line-oriented text log and to a
/// one-object-per-line JSONL log. Both files live under the run's log
/// directory and are truncated when the logger is constructed, so each run
/// starts with empty logs.
pub struct RunLogger {
    log_dir: PathBuf,
    text_log: Mutex<File>,
    jsonl_log: Mutex<File>,
    text_path: PathBuf,
    jsonl_path: PathBuf,
}

impl RunLogger {
    /// Create a logger writing `<prefix>-commands.log` and `<prefix>-run.jsonl`
    /// under `log_dir`, truncating any previous contents.
    pub fn new(log_dir: &Path, prefix: &str) -> AgentResult<Self> {
        fs::create_dir_all(log_dir)?;

        let text_path = log_dir.join(format!("{}-commands.log", prefix));
        let jsonl_path = log_dir.join(format!("{}-run.jsonl", prefix));

        let text_log = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&text_path)?;
        let jsonl_log = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&jsonl_path)?;

        Ok(RunLogger {
            log_dir: log_dir.to_path_buf(),
            text_log: Mutex::new(text_log),
            jsonl_log: Mutex::new(jsonl_log),
            text_path,
            jsonl_path,
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn text_log_path(&self) -> &Path {
        &self.text_path
    }

    pub fn jsonl_log_path(&self) -> &Path {
        &self.jsonl_path
    }

    /// Log a message at the given level to console and both file sinks.
    pub fn log(&self, level: LogLevel, message: &str) {
        let timestamp = chrono::Local::now().to_rfc3339();

        match level {
            LogLevel::Error => eprintln!("{}", message),
            _ => println!("{}", message),
        }

        if let Ok(mut file) = self.text_log.lock() {
            let _ = writeln!(file, "[{}] {}", timestamp, message);
        }

        let record = LogRecord {
            timestamp,
            level: level.as_str(),
            message,
        };
        if let Ok(json) = serde_json::to_string(&record) {
            if let Ok(mut file) = self.jsonl_log.lock() {
                let _ = writeln!(file, "{}", json);
            }
        }
    }

    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }
    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }
    pub fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }
    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }

    /// Record a subprocess invocation with its captured output, verbatim.
    pub fn log_command(&self, command: &str, output: &str, returncode: i32) {
        self.info(&format!("COMMAND: {}", command));
        if !output.is_empty() {
            self.info(&format!("OUTPUT:\n{}", output));
        }
        self.info(&format!("RETURN CODE: {}", returncode));
    }

    /// Log a section banner, matching the run log layout of every phase.
    pub fn section(&self, title: &str) {
        self.info(&"=".repeat(70));
        self.info(title);
        self.info(&"=".repeat(70));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_logger_creates_both_sinks() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "agent").unwrap();
        logger.info("hello");

        assert!(dir.path().join("agent-commands.log").exists());
        assert!(dir.path().join("agent-run.jsonl").exists());
    }

    #[test]
    fn test_sinks_record_every_message() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), "agent").unwrap();
        logger.warn("watch out");
        logger.log_command("echo hi", "hi", 0);

        let text = fs::read_to_string(logger.text_log_path()).unwrap();
        let jsonl = fs::read_to_string(logger.jsonl_log_path()).unwrap();
        assert!(text.contains("watch out"));
        assert!(text.contains("RETURN CODE: 0"));

        // One JSONL record per emitted message: the warn plus the three
        // log_command messages. The OUTPUT message embeds a newline, so it
        // spans two physical text lines but stays a single record.
        let lines: Vec<&str> = jsonl.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(text.lines().count() > lines.len());

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["level"], "WARN");
        assert_eq!(first["message"], "watch out");

        let output: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(output["message"], "OUTPUT:\nhi");
    }

    #[test]
    fn test_logs_truncated_per_run() {
        let dir = tempdir().unwrap();
        {
            let logger = RunLogger::new(dir.path(), "agent").unwrap();
            logger.info("first run");
        }
        let logger = RunLogger::new(dir.path(), "agent").unwrap();
        logger.info("second run");

        let text = fs::read_to_string(logger.text_log_path()).unwrap();
        assert!(!text.contains("first run"));
        assert!(text.contains("second run"));
    }
}
