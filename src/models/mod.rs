//! Data models and structures for the ammeter tester

pub mod config;
pub mod measurement;
pub mod report;

// Re-export main model types
pub use config::{AmmeterRegistry, AnalysisConfig, Config, DeviceConfig, SamplingConfig};
pub use measurement::{Measurement, RunMetadata, TestRunResult};
pub use report::{AnalysisReport, DeviceComparison, DeviceScore};
