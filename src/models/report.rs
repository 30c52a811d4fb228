//! Analysis report and device comparison models

use crate::types::StatisticalMetric;
use serde::{Deserialize, Serialize};

/// Statistical summary of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Descriptive metrics; `None` when not in `analysis.statistical_metrics`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    /// Population standard deviation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Biased sample skewness
    pub skewness: f64,
    /// Biased excess (Fisher) kurtosis
    pub kurtosis: f64,
    /// Student-t interval for the mean, `(low, high)`
    pub confidence_interval_95: (f64, f64),
    pub is_normal_distribution: bool,
    /// Omnibus test p-value; `None` when the sample is too small to test
    #[serde(default)]
    pub normality_p_value: Option<f64>,
    pub outliers_count: usize,

    /// Values that entered the analysis
    pub sample_count: usize,
    /// Failed samples dropped before analysis
    #[serde(default)]
    pub excluded_samples: usize,
}

impl AnalysisReport {
    /// Value of a descriptive metric, if it was computed
    pub fn metric(&self, metric: StatisticalMetric) -> Option<f64> {
        match metric {
            StatisticalMetric::Mean => self.mean,
            StatisticalMetric::Median => self.median,
            StatisticalMetric::StdDev => self.std_dev,
            StatisticalMetric::Min => self.min,
            StatisticalMetric::Max => self.max,
        }
    }

    /// Computed descriptive metrics in report order
    pub fn enabled_metrics(&self) -> Vec<(StatisticalMetric, f64)> {
        StatisticalMetric::ALL
            .iter()
            .filter_map(|&metric| self.metric(metric).map(|value| (metric, value)))
            .collect()
    }
}

/// Score breakdown of one device type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceScore {
    pub device_type: String,
    /// `precision + outliers * outlier_penalty`; lower is better
    pub total_score: f64,
    /// The run's population standard deviation
    pub precision: f64,
    pub outliers: usize,
}

/// Result of ranking a batch of device runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceComparison {
    /// Per-device breakdown in the order the devices were supplied
    pub per_device: Vec<DeviceScore>,
    pub best_device: String,
    /// Penalty weight the scores were computed with
    pub outlier_penalty: f64,
}

impl DeviceComparison {
    /// Look up a device's breakdown
    pub fn get(&self, device_type: &str) -> Option<&DeviceScore> {
        self.per_device.iter().find(|score| score.device_type == device_type)
    }

    /// Breakdown of the winning device
    pub fn best(&self) -> Option<&DeviceScore> {
        self.get(&self.best_device)
    }
}
