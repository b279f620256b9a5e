//! Per-run log files with optional console mirroring.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Logger for a single provisioning run.
///
/// Every message goes to `<log_dir>/<run_name>.log`; formatted lines
/// are also handed to an optional callback so the CLI can mirror them
/// to the console. Raw tool output is tail-buffered, which lets the
/// last lines be shown after a failure even in compact mode.
pub struct RunLogger {
    run_name: String,
    log_path: PathBuf,
    file_writer: Arc<Mutex<Option<BufWriter<File>>>>,
    callback: Arc<Mutex<Option<LogCallback>>>,
    config: LogConfig,
    tail_buffer: Arc<Mutex<VecDeque<String>>>,
    last_progress: Arc<Mutex<u32>>,
}

impl RunLogger {
    /// Create a logger with default configuration.
    pub fn new(run_name: &str, log_dir: &Path) -> std::io::Result<Self> {
        Self::with_config(run_name, log_dir, LogConfig::default())
    }

    /// Create a logger with explicit configuration.
    pub fn with_config(run_name: &str, log_dir: &Path, config: LogConfig) -> std::io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let log_path = log_dir.join(format!("{}.log", sanitize_filename(run_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            run_name: run_name.to_string(),
            log_path,
            file_writer: Arc::new(Mutex::new(Some(BufWriter::new(file)))),
            callback: Arc::new(Mutex::new(None)),
            config,
            tail_buffer: Arc::new(Mutex::new(VecDeque::new())),
            last_progress: Arc::new(Mutex::new(0)),
        })
    }

    /// Install a callback receiving each formatted line.
    pub fn set_callback(&self, callback: LogCallback) {
        *self.callback.lock() = Some(callback);
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, MessagePrefix::Raw, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, MessagePrefix::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, MessagePrefix::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, MessagePrefix::Error, message);
    }

    /// Log an external command about to run.
    pub fn command(&self, command_line: &str) {
        self.log(LogLevel::Info, MessagePrefix::Command, command_line);
    }

    /// Log the start of a major phase.
    pub fn phase(&self, name: &str) {
        self.log(LogLevel::Info, MessagePrefix::Phase, name);
    }

    /// Log a sub-section within a phase.
    pub fn section(&self, name: &str) {
        self.log(LogLevel::Info, MessagePrefix::Section, name);
    }

    /// Log a validation check.
    pub fn validation(&self, message: &str) {
        self.log(LogLevel::Debug, MessagePrefix::Validation, message);
    }

    /// Log successful completion of a phase or run.
    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, MessagePrefix::Success, message);
    }

    /// Log a progress update, filtered to every `progress_step` percent.
    ///
    /// Returns true when the message was actually logged. 100% always
    /// passes the filter.
    pub fn progress(&self, percent: u32, message: &str) -> bool {
        let step = self.config.progress_step.max(1);
        let bucket = (percent / step) * step;
        let mut last = self.last_progress.lock();
        if percent < 100 && bucket == *last {
            return false;
        }
        *last = bucket;
        drop(last);
        self.output(&format!("[{:>3}%] {}", percent, message));
        true
    }

    /// Record a raw line of tool output.
    ///
    /// Always tail-buffered; written out only when compact mode is off.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        let entry = if is_stderr {
            format!("[stderr] {}", line)
        } else {
            line.to_string()
        };

        {
            let mut tail = self.tail_buffer.lock();
            if tail.len() >= self.config.error_tail {
                tail.pop_front();
            }
            tail.push_back(entry.clone());
        }

        if self.config.compact {
            return;
        }
        self.output(&entry);
    }

    /// Emit the buffered output tail, typically after a command failed.
    pub fn show_tail(&self, context: &str) {
        let lines: Vec<String> = {
            let tail = self.tail_buffer.lock();
            tail.iter().cloned().collect()
        };
        if lines.is_empty() {
            return;
        }
        self.output(&format!("[{}/tail]", context));
        for line in &lines {
            self.output(line);
        }
    }

    fn log(&self, level: LogLevel, prefix: MessagePrefix, message: &str) {
        if level < self.config.level {
            return;
        }
        self.output(&prefix.format(message));
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, message: &str) {
        let formatted = self.format_message(message);

        if let Some(writer) = self.file_writer.lock().as_mut() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(callback) = self.callback.lock().as_ref() {
            callback(&formatted);
        }
    }

    /// Flush and close the log file.
    pub fn close(&self) {
        if let Some(mut writer) = self.file_writer.lock().take() {
            let _ = writer.flush();
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Replace characters that are unsafe in file names.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

/// Builder for [`RunLogger`].
pub struct RunLoggerBuilder {
    run_name: String,
    log_dir: PathBuf,
    config: LogConfig,
    callback: Option<LogCallback>,
}

impl RunLoggerBuilder {
    pub fn new(run_name: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_name: run_name.into(),
            log_dir: log_dir.into(),
            config: LogConfig::default(),
            callback: None,
        }
    }

    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn compact(mut self, compact: bool) -> Self {
        self.config.compact = compact;
        self
    }

    pub fn callback(mut self, callback: LogCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn build(self) -> std::io::Result<RunLogger> {
        let logger = RunLogger::with_config(&self.run_name, &self.log_dir, self.config)?;
        if let Some(callback) = self.callback {
            logger.set_callback(callback);
        }
        Ok(logger)
    }
}
