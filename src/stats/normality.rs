//! D'Agostino-Pearson omnibus normality test
//!
//! Combines a skewness z-score (D'Agostino 1970) and a kurtosis z-score
//! (Anscombe & Glynn 1983) into `K2 = Zs^2 + Zk^2`, which is chi-squared with
//! two degrees of freedom under the null hypothesis of normality.

use super::advanced::{kurtosis, skewness};
use super::descriptive::mean;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Outcome of the omnibus test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub skew_z: f64,
    pub kurtosis_z: f64,
    /// `K2` statistic
    pub statistic: f64,
    pub p_value: f64,
}

impl NormalityTest {
    /// Fail to reject normality at significance `alpha`
    pub fn is_normal(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Skewness z-score for a biased sample skewness `b` over `n` values
pub fn skew_z_score(b: f64, n: f64) -> f64 {
    let y = b * (((n + 1.0) * (n + 3.0)) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    let y = if y == 0.0 { 1.0 } else { y };
    delta * (y / alpha + ((y / alpha).powi(2) + 1.0).sqrt()).ln()
}

/// Kurtosis z-score for a biased Pearson kurtosis `b2` (normal = 3) over `n` values
pub fn kurtosis_z_score(b2: f64, n: f64) -> f64 {
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let variance = 24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0) * (n + 1.0) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / variance.sqrt();

    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * ((6.0 * (n + 3.0) * (n + 5.0)) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0 + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());

    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).powf(1.0 / 3.0);

    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}

/// Run the omnibus test.
///
/// Returns `Ok(None)` when the sample is smaller than `min_samples` (at least
/// 8 are needed for the skewness approximation), when the values do not vary,
/// or when the statistic is not finite.
pub fn omnibus_test(values: &[f64], min_samples: usize) -> Result<Option<NormalityTest>> {
    let n = values.len();
    if n < min_samples.max(8) {
        return Ok(None);
    }

    let m = mean(values);
    if values.iter().all(|&x| x == values[0]) {
        return Ok(None);
    }

    let n = n as f64;
    let skew_z = skew_z_score(skewness(values, m), n);
    let kurtosis_z = kurtosis_z_score(kurtosis(values, m) + 3.0, n);
    let statistic = skew_z * skew_z + kurtosis_z * kurtosis_z;

    if !statistic.is_finite() {
        return Ok(None);
    }

    let chi_squared = ChiSquared::new(2.0)?;
    Ok(Some(NormalityTest {
        skew_z,
        kurtosis_z,
        statistic,
        p_value: chi_squared.sf(statistic),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Evenly spaced standard normal quantiles
    fn normal_quantiles(n: usize) -> Vec<f64> {
        use statrs::distribution::Normal;
        let normal = Normal::new(0.0, 1.0).unwrap();
        (1..=n).map(|i| normal.inverse_cdf((i as f64 - 0.5) / n as f64)).collect()
    }

    #[test]
    fn test_small_samples_are_not_tested() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert!(omnibus_test(&values, 8).unwrap().is_none());
    }

    #[test]
    fn test_constant_sample_is_not_tested() {
        assert!(omnibus_test(&[10.0; 100], 8).unwrap().is_none());
    }

    #[test]
    fn test_normal_quantiles_pass() {
        let values = normal_quantiles(200);
        let result = omnibus_test(&values, 8).unwrap().unwrap();
        assert!(result.p_value > 0.05, "p = {}", result.p_value);
        assert!(result.is_normal(0.05));
    }

    #[test]
    fn test_heavily_skewed_sample_fails() {
        let values: Vec<f64> = (0..200).map(|i| (i as f64 / 20.0).exp()).collect();
        let result = omnibus_test(&values, 8).unwrap().unwrap();
        assert!(result.p_value < 0.05, "p = {}", result.p_value);
        assert!(!result.is_normal(0.05));
    }

    #[test]
    fn test_p_value_is_chi_squared_survival() {
        let values: Vec<f64> = (1..=30).map(|i| (i * i) as f64).collect();
        let result = omnibus_test(&values, 8).unwrap().unwrap();
        // Survival function of chi2(2) is exp(-x/2)
        assert!((result.p_value - (-result.statistic / 2.0).exp()).abs() < 1e-7);
    }

    #[test]
    fn test_skew_z_score_direction() {
        assert!(skew_z_score(1.0, 50.0) > 2.0);
        assert!(skew_z_score(-1.0, 50.0) < -2.0);
        assert!(skew_z_score(0.5, 50.0) < skew_z_score(1.0, 50.0));
    }
}
