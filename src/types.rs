//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Descriptive statistics that can be enabled in `analysis.statistical_metrics`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticalMetric {
    Mean,
    Median,
    StdDev,
    Min,
    Max,
}

impl StatisticalMetric {
    /// Every metric, in report order
    pub const ALL: [StatisticalMetric; 5] = [
        StatisticalMetric::Mean,
        StatisticalMetric::Median,
        StatisticalMetric::StdDev,
        StatisticalMetric::Min,
        StatisticalMetric::Max,
    ];

    /// Configuration name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::StdDev => "std_dev",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for StatisticalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatisticalMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "std_dev" | "stddev" | "std" => Ok(Self::StdDev),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(AppError::validation(format!(
                "Unknown statistical metric '{}' (expected one of: mean, median, std_dev, min, max)",
                other
            ))),
        }
    }
}

/// How failed acquisitions enter the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Drop failed samples and report how many were dropped
    #[default]
    Exclude,
    /// Analyze failed samples with their sentinel value
    Sentinel,
}

impl FromStr for FailurePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "exclude" => Ok(Self::Exclude),
            "sentinel" => Ok(Self::Sentinel),
            other => Err(AppError::validation(format!(
                "Unknown failure policy '{}' (expected 'exclude' or 'sentinel')",
                other
            ))),
        }
    }
}

/// Outcome tag of a single acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    /// The device answered with a parsable reading
    Acquired,
    /// Transport failure, timeout or unparsable reading
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_parsing() {
        assert_eq!("mean".parse::<StatisticalMetric>().unwrap(), StatisticalMetric::Mean);
        assert_eq!("STD_DEV".parse::<StatisticalMetric>().unwrap(), StatisticalMetric::StdDev);
        assert_eq!(" max ".parse::<StatisticalMetric>().unwrap(), StatisticalMetric::Max);
        assert!("variance".parse::<StatisticalMetric>().is_err());
    }

    #[test]
    fn test_metric_serde_names() {
        let json = serde_json::to_string(&StatisticalMetric::ALL).unwrap();
        assert_eq!(json, r#"["mean","median","std_dev","min","max"]"#);
    }

    #[test]
    fn test_failure_policy_default_and_parsing() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::Exclude);
        assert_eq!("sentinel".parse::<FailurePolicy>().unwrap(), FailurePolicy::Sentinel);
        assert!("retry".parse::<FailurePolicy>().is_err());
    }
}
