//! Structured logging for the ammeter tester
//!
//! Entries carry a level, the emitting component, an optional correlation id
//! (the run id while sampling) and typed fields. A logger either prints them
//! (console lines or JSON in debug mode) or keeps them in a [`LogCapture`] so
//! tests can assert on what a component reported.

use crate::error::{AppError, Result};
use crate::models::{AnalysisReport, Config};
use chrono::{DateTime, Utc};
use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Per-sample detail
    Debug,
    /// Run lifecycle
    Info,
    /// Degraded but continuing
    Warn,
    /// A sample, a run or an archive write failed
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn color(&self) -> Color {
        match self {
            LogLevel::Debug => Color::Cyan,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(AppError::parse(format!("Invalid log level: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Emitting component, e.g. `SAMPLER`
    pub logger: String,
    pub correlation_id: Option<String>,
    pub fields: BTreeMap<String, serde_json::Value>,
    /// `file:line` of the call site, when logged through a macro
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Entries retained by a capturing logger
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogCapture {
    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    pub fn at_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries().into_iter().filter(|e| e.level == level).collect()
    }

    /// Whether any entry at `level` contains `needle` in its message
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.entries().iter().any(|e| e.level == level && e.message.contains(needle))
    }

    fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

#[derive(Debug, Clone)]
enum Sink {
    Console { color: bool, location: bool },
    Json,
    Capture(LogCapture),
    Discard,
}

/// Component logger; clones share the same sink
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
    min_level: LogLevel,
    session_id: Option<Arc<str>>,
    sink: Sink,
}

impl Logger {
    /// Console logger at `Info`
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            min_level: LogLevel::Info,
            session_id: None,
            sink: Sink::Console { color: true, location: false },
        }
    }

    /// Level and format follow the verbose and debug flags; debug switches to JSON
    pub fn with_config(name: &str, config: &Config) -> Self {
        let min_level = match (config.debug, config.verbose) {
            (true, _) => LogLevel::Debug,
            (false, true) => LogLevel::Info,
            (false, false) => LogLevel::Warn,
        };
        let sink = if config.debug {
            Sink::Json
        } else {
            Sink::Console { color: config.enable_color, location: config.verbose }
        };

        Self { name: name.to_string(), min_level, session_id: None, sink }
    }

    /// Keeps every entry in memory and prints nothing
    pub fn capturing(name: &str) -> (Self, LogCapture) {
        let capture = LogCapture::default();
        let logger = Self {
            name: name.to_string(),
            min_level: LogLevel::Debug,
            session_id: None,
            sink: Sink::Capture(capture.clone()),
        };
        (logger, capture)
    }

    /// Drops everything
    pub fn quiet(name: &str) -> Self {
        Self {
            name: name.to_string(),
            min_level: LogLevel::Error,
            session_id: None,
            sink: Sink::Discard,
        }
    }

    /// Same sink and session under another component name
    pub fn named(&self, name: &str) -> Self {
        Self { name: name.to_string(), ..self.clone() }
    }

    /// Stamp every entry with `session_id`
    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(Arc::from(session_id));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        self.min_level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        !matches!(self.sink, Sink::Discard) && level >= self.min_level
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder {
            logger: self,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message: message.to_string(),
                logger: self.name.clone(),
                correlation_id: None,
                fields: BTreeMap::new(),
                location: None,
            },
        }
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    fn emit(&self, mut entry: LogEntry) {
        if !self.enabled(entry.level) {
            return;
        }
        if let Some(ref session_id) = self.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::from(&**session_id));
        }

        let line = match self.sink {
            Sink::Discard => return,
            Sink::Capture(ref capture) => {
                capture.push(entry);
                return;
            }
            Sink::Json => serde_json::to_string(&entry).unwrap_or_else(|e| format!("{{\"log_error\":\"{}\"}}", e)),
            Sink::Console { color, location } => render_console(&entry, color, location),
        };

        // Reports go to stdout; keep warnings and errors off it
        if entry.level >= LogLevel::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

/// `HH:MM:SS.mmm LEVEL [COMPONENT] message [run-id] {k=v, ...}`
fn render_console(entry: &LogEntry, color: bool, location: bool) -> String {
    let level = format!("{:>5}", entry.level.as_str());
    let level = if color { level.color(entry.level.color()).to_string() } else { level };

    let mut line = format!(
        "{} {} [{}] {}",
        entry.timestamp.format("%H:%M:%S%.3f"),
        level,
        entry.logger,
        entry.message
    );

    if let Some(ref id) = entry.correlation_id {
        let short: String = id.chars().take(8).collect();
        line.push_str(&format!(" [{}]", short));
    }
    if !entry.fields.is_empty() {
        let fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        line.push_str(&format!(" {{{}}}", fields.join(", ")));
    }
    if location {
        if let Some(ref at) = entry.location {
            line.push_str(&format!(" @ {}", at));
        }
    }
    line
}

pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl LogEntryBuilder<'_> {
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Values that fail to serialize are skipped
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32) -> Self {
        self.entry.location = Some(format!("{}:{}", file, line));
        self
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_exit_code", error.exit_code())
    }

    pub fn log(self) {
        self.logger.emit(self.entry);
    }
}

/// Events of the acquisition loop
#[derive(Debug, Clone)]
pub struct SamplingLogger {
    logger: Logger,
}

impl SamplingLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger: logger.named("SAMPLER") }
    }

    pub fn log_run_start(&self, device_type: &str, run_id: &str, address: &str, count: u32, frequency_hz: f64) {
        self.logger.info(&format!("Sampling {} at {} ({} samples @ {} Hz)", device_type, address, count, frequency_hz))
            .correlation_id(run_id)
            .field("device_type", device_type)
            .field("address", address)
            .field("measurements_count", count)
            .field("sampling_frequency_hz", frequency_hz)
            .log();
    }

    pub fn log_sample(&self, device_type: &str, run_id: &str, index: u32, value: f64, elapsed_ms: f64) {
        self.logger.debug(&format!("{} sample {} = {}", device_type, index, value))
            .correlation_id(run_id)
            .field("index", index)
            .field("value", value)
            .field("elapsed_ms", elapsed_ms)
            .log();
    }

    /// One failed acquisition; sampling continues
    pub fn log_sample_failure(&self, device_type: &str, run_id: &str, index: u32, error: &AppError) {
        self.logger.error(&format!("{} sample {} failed: {}", device_type, index, error))
            .correlation_id(run_id)
            .field("device_type", device_type)
            .field("index", index)
            .error_info(error)
            .log();
    }

    pub fn log_stopped(&self, device_type: &str, run_id: &str, sent: u32, reason: &str) {
        self.logger.warn(&format!("{} sampling stopped after {} samples: {}", device_type, sent, reason))
            .correlation_id(run_id)
            .field("samples_sent", sent)
            .field("reason", reason)
            .log();
    }

    pub fn log_run_complete(&self, device_type: &str, run_id: &str, acquired: u32, failed: u32, elapsed: std::time::Duration) {
        self.logger.info(&format!(
            "{} sampling complete: {} acquired, {} failed in {:.3}s",
            device_type, acquired, failed, elapsed.as_secs_f64()
        ))
            .correlation_id(run_id)
            .field("acquired", acquired)
            .field("failed", failed)
            .field("elapsed_seconds", elapsed.as_secs_f64())
            .log();
    }
}

/// Events of the analyzer and the ranker
#[derive(Debug, Clone)]
pub struct AnalysisLogger {
    logger: Logger,
}

impl AnalysisLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger: logger.named("ANALYSIS") }
    }

    pub fn log_empty_input(&self, excluded: usize) {
        self.logger.error("No measurements available for analysis")
            .field("excluded_samples", excluded)
            .log();
    }

    pub fn log_report(&self, report: &AnalysisReport) {
        self.logger.info(&format!(
            "Analyzed {} samples ({} excluded, {} outliers)",
            report.sample_count, report.excluded_samples, report.outliers_count
        ))
            .field("is_normal_distribution", report.is_normal_distribution)
            .field("std_dev", report.std_dev)
            .log();
    }

    pub fn log_analysis_failed(&self, error: &AppError) {
        self.logger.error(&format!("Analysis failed: {}", error)).error_info(error).log();
    }

    pub fn log_ranking_rejected(&self, error: &AppError) {
        self.logger.error(&format!("Device ranking rejected: {}", error)).error_info(error).log();
    }

    pub fn log_device_score(&self, device_type: &str, precision: f64, outliers: usize, score: f64) {
        self.logger.debug(&format!("{} scored {:.6}", device_type, score))
            .field("precision", precision)
            .field("outliers", outliers)
            .log();
    }

    pub fn log_best_device(&self, device_type: &str, score: f64, candidates: usize) {
        self.logger.info(&format!("Best device: {} (score {:.6} across {} candidates)", device_type, score, candidates))
            .field("candidates", candidates)
            .log();
    }
}

/// Wall-clock timing of named run phases
pub struct PerformanceLogger {
    logger: Logger,
    started: HashMap<String, Instant>,
}

impl PerformanceLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger: logger.named("PERF"), started: HashMap::new() }
    }

    pub fn start_timing(&mut self, operation: &str) {
        self.started.insert(operation.to_string(), Instant::now());
        self.logger.debug(&format!("Started timing: {}", operation)).log();
    }

    /// Elapsed time since `start_timing`; `None` for an operation never started
    pub fn end_timing(&mut self, operation: &str) -> Option<std::time::Duration> {
        let Some(start) = self.started.remove(operation) else {
            self.logger.warn(&format!("Timing never started for {}", operation)).log();
            return None;
        };

        let elapsed = start.elapsed();
        self.logger.info(&format!("Completed {} in {}ms", operation, elapsed.as_millis()))
            .correlation_id(operation)
            .field("duration_ms", elapsed.as_secs_f64() * 1000.0)
            .log();
        Some(elapsed)
    }

    pub fn in_flight(&self) -> usize {
        self.started.len()
    }
}

/// Errors the framework absorbs or is about to return
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger: logger.named("ERR") }
    }

    pub fn log_error(&self, error: &AppError, context: Option<&str>, correlation_id: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let mut builder = self.logger.error(&message).error_info(error);
        if let Some(id) = correlation_id {
            builder = builder.correlation_id(id);
        }
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }
        builder.log();
    }
}

/// Hands out loggers stamped with one session id
pub struct LoggerFactory {
    base: Logger,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: &Config) -> Self {
        Self::from_logger(Logger::with_config("APP", config))
    }

    /// Factory over an existing sink, e.g. a capturing logger
    pub fn from_logger(base: Logger) -> Self {
        let session_id = Uuid::new_v4().to_string();
        Self { base: base.with_session(&session_id), session_id }
    }

    pub fn create_logger(&self, name: &str) -> Logger {
        self.base.named(name)
    }

    pub fn create_performance_logger(&self) -> PerformanceLogger {
        PerformanceLogger::new(self.base.clone())
    }

    pub fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger::new(self.base.clone())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*)).location(file!(), line!()).log()
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*)).location(file!(), line!()).log()
    };
}
