//! Statistical analysis of completed sampling runs

pub mod advanced;
pub mod descriptive;
pub mod normality;


pub use advanced::TukeyFences;
pub use normality::NormalityTest;

use crate::{
    error::{AppError, Result},
    logging::{AnalysisLogger, Logger},
    models::{AnalysisConfig, AnalysisReport, Measurement},
    types::{FailurePolicy, StatisticalMetric},
    utils::sorted_values,
};

/// Thresholds used by the analyzer
#[derive(Debug, Clone)]
pub struct StatisticsConfig {
    /// Confidence level of the mean interval
    pub confidence_level: f64,
    /// Significance level of the normality test
    pub normality_alpha: f64,
    /// Smallest sample the normality test runs on
    pub min_normality_samples: usize,
    /// Tukey fence multiplier
    pub iqr_multiplier: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            confidence_level: crate::defaults::CONFIDENCE_LEVEL,
            normality_alpha: crate::defaults::NORMALITY_ALPHA,
            min_normality_samples: crate::defaults::MIN_NORMALITY_SAMPLES,
            iqr_multiplier: crate::defaults::IQR_FENCE_MULTIPLIER,
        }
    }
}

/// Turns a measurement sequence into an [`AnalysisReport`].
///
/// Holds no per-run state, so one analyzer can serve any number of runs,
/// concurrently or not.
#[derive(Debug, Clone)]
pub struct ResultAnalyzer {
    metrics: Vec<StatisticalMetric>,
    failure_policy: FailurePolicy,
    config: StatisticsConfig,
    logger: AnalysisLogger,
}

impl ResultAnalyzer {
    pub fn new(metrics: Vec<StatisticalMetric>, failure_policy: FailurePolicy, logger: Logger) -> Self {
        Self {
            metrics,
            failure_policy,
            config: StatisticsConfig::default(),
            logger: AnalysisLogger::new(logger),
        }
    }

    /// Analyzer for the `analysis` configuration section
    pub fn from_config(config: &AnalysisConfig, logger: Logger) -> Self {
        Self::new(config.statistical_metrics.clone(), config.failure_policy, logger)
    }

    /// Every metric, failed samples excluded, no log output
    pub fn with_defaults() -> Self {
        Self::new(StatisticalMetric::ALL.to_vec(), FailurePolicy::default(), Logger::quiet("ANALYSIS"))
    }

    pub fn with_statistics_config(mut self, config: StatisticsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Analyze a run. Returns `None`, after logging, when nothing is left to analyze.
    pub fn analyze(&self, measurements: &[Measurement]) -> Option<AnalysisReport> {
        match self.try_analyze(measurements) {
            Ok(report) => Some(report),
            Err(AppError::AnalysisInput(_)) => {
                self.logger.log_empty_input(measurements.len());
                None
            }
            Err(error) => {
                self.logger.log_analysis_failed(&error);
                None
            }
        }
    }

    /// Analyze a run, failing with `AnalysisInput` when nothing is left to analyze
    pub fn try_analyze(&self, measurements: &[Measurement]) -> Result<AnalysisReport> {
        let values: Vec<f64> = match self.failure_policy {
            FailurePolicy::Exclude => measurements
                .iter()
                .filter(|m| m.is_acquired())
                .map(|m| m.value)
                .collect(),
            FailurePolicy::Sentinel => measurements.iter().map(|m| m.value).collect(),
        };
        let excluded = measurements.len() - values.len();

        if values.is_empty() && excluded > 0 {
            return Err(AppError::analysis_input(format!(
                "all {} samples failed and were excluded",
                excluded
            )));
        }

        let mut report = self.analyze_values(&values)?;
        report.excluded_samples = excluded;
        Ok(report)
    }

    /// Analyze raw readings
    pub fn analyze_values(&self, values: &[f64]) -> Result<AnalysisReport> {
        if values.is_empty() {
            return Err(AppError::analysis_input("no measurements to analyze"));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(AppError::validation(format!("cannot analyze non-finite reading {}", bad)));
        }

        let sorted = sorted_values(values);
        let n = sorted.len();
        let min = sorted[0];
        let max = sorted[n - 1];
        let constant = min == max;

        // A constant sample is summarized exactly, without rounding noise in the moments
        let mean = if constant { min } else { descriptive::mean(values) };
        let std_dev = if constant { 0.0 } else { descriptive::population_std_dev(values, mean) };
        let (skewness, kurtosis) = if constant {
            (0.0, 0.0)
        } else {
            (advanced::skewness(values, mean), advanced::kurtosis(values, mean))
        };
        let confidence_interval_95 = if constant {
            (mean, mean)
        } else {
            advanced::confidence_interval(values, mean, self.config.confidence_level)?
        };

        let normality = normality::omnibus_test(values, self.config.min_normality_samples)?;
        let fences = TukeyFences::from_sorted(&sorted, self.config.iqr_multiplier);

        let enabled = |metric: StatisticalMetric| self.metrics.contains(&metric);
        let report = AnalysisReport {
            mean: enabled(StatisticalMetric::Mean).then_some(mean),
            median: enabled(StatisticalMetric::Median).then(|| descriptive::median(&sorted)),
            std_dev: enabled(StatisticalMetric::StdDev).then_some(std_dev),
            min: enabled(StatisticalMetric::Min).then_some(min),
            max: enabled(StatisticalMetric::Max).then_some(max),
            skewness,
            kurtosis,
            confidence_interval_95,
            is_normal_distribution: normality
                .map(|test| test.is_normal(self.config.normality_alpha))
                .unwrap_or(false),
            normality_p_value: normality.map(|test| test.p_value),
            outliers_count: fences.count_outliers(values),
            sample_count: n,
            excluded_samples: 0,
        };

        self.logger.log_report(&report);
        Ok(report)
    }
}
