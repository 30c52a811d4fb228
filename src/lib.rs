//! Ammeter Tester
//!
//! Polls networked ammeters at a fixed cadence, summarizes each run with
//! descriptive statistics, a normality test and outlier counts, and ranks
//! device types by measurement precision.

pub mod app;
pub mod cli;
pub mod config;
pub mod client;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod ranking;
pub mod sampling;
pub mod stats;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{AnalysisReport, Config, DeviceComparison, DeviceConfig, Measurement, TestRunResult};
pub use client::{AmmeterClient, TcpAmmeterClient};
pub use sampling::{CancelToken, DataCollector};
pub use stats::ResultAnalyzer;
pub use ranking::DeviceRanker;
pub use output::{OutputFormatter, ColoredFormatter, PlainFormatter, OutputFormatterFactory};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build provenance, set by build.rs
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_CONFIG_PATH: &str = "config/test_config.json";
    pub const DEFAULT_SAMPLING_FREQUENCY_HZ: f64 = 10.0;
    pub const DEFAULT_MEASUREMENTS_COUNT: u32 = 100;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    pub const DEFAULT_AMMETERS: &[(&str, u16, &str)] = &[
        ("greenlee", 5000, "MEASURE_GREENLEE -get_measurement"),
        ("entes", 5001, "MEASURE_ENTES -get_data"),
        ("circutor", 5002, "MEASURE_CIRCUTOR -get_measurement -current"),
    ];
    pub const DEFAULT_OUTLIER_PENALTY: f64 = 0.1;
    pub const DEFAULT_SAVE_PATH: &str = "results";
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Value recorded for a failed acquisition
    pub const SENTINEL_VALUE: f64 = 0.0;
    /// Bounded queue between sampler and collector
    pub const CHANNEL_CAPACITY: usize = 64;
    /// Largest device response read per request
    pub const MAX_RESPONSE_BYTES: usize = 1024;

    pub const CONFIDENCE_LEVEL: f64 = 0.95;
    pub const NORMALITY_ALPHA: f64 = 0.05;
    /// Smallest sample the omnibus normality test accepts
    pub const MIN_NORMALITY_SAMPLES: usize = 8;
    pub const IQR_FENCE_MULTIPLIER: f64 = 1.5;
}
