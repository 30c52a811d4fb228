//! Shape statistics, confidence interval and outlier fences

use super::descriptive::{central_moment, percentile, sample_std_dev};
use crate::error::{AppError, Result};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Biased sample skewness `m3 / m2^1.5`; zero when the values do not vary
pub fn skewness(values: &[f64], mean: f64) -> f64 {
    let m2 = central_moment(values, mean, 2);
    if m2 == 0.0 {
        return 0.0;
    }
    central_moment(values, mean, 3) / m2.powf(1.5)
}

/// Biased excess kurtosis `m4 / m2^2 - 3`; zero when the values do not vary
pub fn kurtosis(values: &[f64], mean: f64) -> f64 {
    let m2 = central_moment(values, mean, 2);
    if m2 == 0.0 {
        return 0.0;
    }
    central_moment(values, mean, 4) / (m2 * m2) - 3.0
}

/// Student-t confidence interval for the mean.
///
/// Uses the standard error of the mean with `n - 1` degrees of freedom.
/// Collapses to `(mean, mean)` for a single value or a constant sample.
pub fn confidence_interval(values: &[f64], mean: f64, level: f64) -> Result<(f64, f64)> {
    if level.is_nan() || level <= 0.0 || level >= 1.0 {
        return Err(AppError::statistics(format!("Confidence level must be in (0, 1), got {}", level)));
    }

    let n = values.len();
    let std_dev = sample_std_dev(values, mean);
    if n < 2 || std_dev == 0.0 {
        return Ok((mean, mean));
    }

    let t = StudentsT::new(0.0, 1.0, (n - 1) as f64)?;
    let critical = t.inverse_cdf(0.5 + level / 2.0);
    let margin = critical * std_dev / (n as f64).sqrt();

    Ok((mean - margin, mean + margin))
}

/// Tukey's fences `[Q1 - k*IQR, Q3 + k*IQR]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TukeyFences {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl TukeyFences {
    /// Fences of an ascending slice
    pub fn from_sorted(sorted_values: &[f64], multiplier: f64) -> Self {
        let q1 = percentile(sorted_values, 25.0);
        let q3 = percentile(sorted_values, 75.0);
        let iqr = q3 - q1;
        Self {
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        }
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }

    pub fn count_outliers(&self, values: &[f64]) -> usize {
        values.iter().filter(|&&x| self.is_outlier(x)).count()
    }
}
