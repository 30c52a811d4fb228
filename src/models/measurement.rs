//! Measurement and test run data models

use crate::models::config::SamplingConfig;
use crate::models::report::AnalysisReport;
use crate::types::SampleStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped reading, built by the collector when it dequeues a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Wall-clock time the sample was dequeued
    pub timestamp: DateTime<Utc>,

    /// Reading in amperes; the sentinel value for failed samples
    pub value: f64,

    /// Run this measurement belongs to
    pub run_id: String,

    /// Whether the device actually produced this value
    pub status: SampleStatus,

    /// Why the acquisition failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Measurement {
    /// Successful reading stamped now
    pub fn acquired(value: f64, run_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            value,
            run_id: run_id.into(),
            status: SampleStatus::Acquired,
            error_message: None,
        }
    }

    /// Failed acquisition stamped now, carrying the sentinel value
    pub fn failed(error_message: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            value: crate::defaults::SENTINEL_VALUE,
            run_id: run_id.into(),
            status: SampleStatus::Failed,
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.status == SampleStatus::Acquired
    }
}

/// Descriptive header of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub device_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub sampling_frequency_hz: f64,
    pub measurements_count: u32,
    /// Configured, advisory duration
    pub total_duration_seconds: f64,
}

/// Everything one run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunResult {
    pub metadata: RunMetadata,
    pub measurements: Vec<Measurement>,
    /// `None` until the run is finalized, or when nothing could be analyzed
    pub analysis: Option<AnalysisReport>,
}

impl TestRunResult {
    /// Start a run record
    pub fn new(device_type: impl Into<String>, run_id: impl Into<String>, sampling: &SamplingConfig) -> Self {
        Self {
            metadata: RunMetadata {
                run_id: run_id.into(),
                device_type: device_type.into(),
                started_at: Utc::now(),
                completed_at: None,
                sampling_frequency_hz: sampling.sampling_frequency_hz,
                measurements_count: sampling.measurements_count,
                total_duration_seconds: sampling.total_duration_seconds,
            },
            measurements: Vec::new(),
            analysis: None,
        }
    }

    /// Attach the collected measurements and their report, and stamp completion
    pub fn finalize(mut self, measurements: Vec<Measurement>, analysis: Option<AnalysisReport>) -> Self {
        self.measurements = measurements;
        self.analysis = analysis;
        self.metadata.completed_at = Some(Utc::now());
        self
    }

    pub fn run_id(&self) -> &str {
        &self.metadata.run_id
    }

    pub fn device_type(&self) -> &str {
        &self.metadata.device_type
    }

    pub fn is_finalized(&self) -> bool {
        self.metadata.completed_at.is_some()
    }

    pub fn acquired_count(&self) -> usize {
        self.measurements.iter().filter(|m| m.is_acquired()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.measurements.len() - self.acquired_count()
    }

    /// Actual wall-clock length of the run, once finalized
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.metadata.completed_at.map(|end| end - self.metadata.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_measurement_uses_sentinel() {
        let measurement = Measurement::failed("Connection refused", "run-1");
        assert_eq!(measurement.value, 0.0);
        assert!(!measurement.is_acquired());
        assert_eq!(measurement.error_message.as_deref(), Some("Connection refused"));
    }

    #[test]
    fn test_run_lifecycle() {
        let sampling = SamplingConfig::default();
        let run = TestRunResult::new("greenlee", "run-1", &sampling);
        assert!(!run.is_finalized());
        assert!(run.elapsed().is_none());

        let measurements = vec![
            Measurement::acquired(1.5, "run-1"),
            Measurement::failed("timeout", "run-1"),
            Measurement::acquired(1.7, "run-1"),
        ];
        let run = run.finalize(measurements, None);

        assert!(run.is_finalized());
        assert_eq!(run.device_type(), "greenlee");
        assert_eq!(run.acquired_count(), 2);
        assert_eq!(run.failed_count(), 1);
        assert!(run.elapsed().unwrap() >= chrono::Duration::zero());
    }

    #[test]
    fn test_measurement_serialization_skips_empty_error() {
        let json = serde_json::to_string(&Measurement::acquired(2.0, "r")).unwrap();
        assert!(!json.contains("error_message"));
        assert!(json.contains("\"status\":\"acquired\""));
    }
}
