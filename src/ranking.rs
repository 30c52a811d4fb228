//! Cross-device reliability ranking
//!
//! A device's score is its run's population standard deviation plus a fixed
//! penalty per outlier. The lowest score wins; on a tie the device supplied
//! first keeps the win.

use crate::{
    error::{AppError, Result},
    logging::{AnalysisLogger, Logger},
    models::{AnalysisReport, DeviceComparison, DeviceScore, TestRunResult},
    utils::first_min_index,
};

/// Picks the most reliable device from a batch of analysis reports
#[derive(Debug, Clone)]
pub struct DeviceRanker {
    outlier_penalty: f64,
    logger: AnalysisLogger,
}

impl DeviceRanker {
    pub fn new(outlier_penalty: f64, logger: Logger) -> Self {
        Self {
            outlier_penalty,
            logger: AnalysisLogger::new(logger),
        }
    }

    /// Ranker with the default penalty and no log output
    pub fn with_defaults() -> Self {
        Self::new(crate::defaults::DEFAULT_OUTLIER_PENALTY, Logger::quiet("RANKING"))
    }

    pub fn outlier_penalty(&self) -> f64 {
        self.outlier_penalty
    }

    /// `precision + outliers * penalty`
    pub fn score(&self, precision: f64, outliers: usize) -> f64 {
        precision + outliers as f64 * self.outlier_penalty
    }

    /// Rank `(device_type, report)` pairs in the order given.
    ///
    /// Every device is validated before any is scored: an empty batch, a
    /// missing report, a report over zero samples or one without `std_dev`
    /// is a `RankingInput` error.
    pub fn identify_best_device(&self, reports: &[(String, Option<AnalysisReport>)]) -> Result<DeviceComparison> {
        let validated = match self.validate(reports) {
            Ok(validated) => validated,
            Err(error) => {
                self.logger.log_ranking_rejected(&error);
                return Err(error);
            }
        };

        let per_device: Vec<DeviceScore> = validated
            .into_iter()
            .map(|(device_type, precision, outliers)| {
                let total_score = self.score(precision, outliers);
                self.logger.log_device_score(device_type, precision, outliers, total_score);
                DeviceScore {
                    device_type: device_type.to_string(),
                    total_score,
                    precision,
                    outliers,
                }
            })
            .collect();

        let best_index = first_min_index(&per_device, |score| score.total_score)
            .ok_or_else(|| AppError::internal("validated batch produced no scores"))?;
        let best = &per_device[best_index];
        self.logger.log_best_device(&best.device_type, best.total_score, per_device.len());

        Ok(DeviceComparison {
            best_device: best.device_type.clone(),
            per_device,
            outlier_penalty: self.outlier_penalty,
        })
    }

    /// Rank finished runs in the order given
    pub fn rank_runs(&self, runs: &[TestRunResult]) -> Result<DeviceComparison> {
        let reports: Vec<(String, Option<AnalysisReport>)> = runs
            .iter()
            .map(|run| (run.device_type().to_string(), run.analysis.clone()))
            .collect();
        self.identify_best_device(&reports)
    }

    fn validate<'a>(&self, reports: &'a [(String, Option<AnalysisReport>)]) -> Result<Vec<(&'a str, f64, usize)>> {
        if reports.is_empty() {
            return Err(AppError::ranking_input("no devices to rank"));
        }

        let mut validated = Vec::with_capacity(reports.len());
        for (device_type, report) in reports {
            let report = report.as_ref().ok_or_else(|| {
                AppError::ranking_input(format!("device '{}' has no analysis report", device_type))
            })?;

            if report.sample_count == 0 {
                return Err(AppError::ranking_input(format!(
                    "device '{}' has no measurements",
                    device_type
                )));
            }

            let precision = report.std_dev.ok_or_else(|| {
                AppError::ranking_input(format!(
                    "device '{}' report has no std_dev; enable it in analysis.statistical_metrics",
                    device_type
                ))
            })?;

            validated.push((device_type.as_str(), precision, report.outliers_count));
        }

        Ok(validated)
    }
}
