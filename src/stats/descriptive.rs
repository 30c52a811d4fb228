//! Descriptive statistics over a slice of readings
//!
//! Every function here expects a non-empty slice; the analyzer rejects empty
//! input before calling them.

use crate::utils::safe_float_cmp;

/// Arithmetic mean
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of an ascending slice
pub fn median(sorted_values: &[f64]) -> f64 {
    percentile(sorted_values, 50.0)
}

/// k-th central moment about `mean`, normalized by `n`
pub fn central_moment(values: &[f64], mean: f64, k: i32) -> f64 {
    values.iter().map(|x| (x - mean).powi(k)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation (`ddof = 0`)
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    central_moment(values, mean, 2).sqrt()
}

/// Sample standard deviation (`ddof = 1`); zero for fewer than two values
pub fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }

    let variance = values.iter()
        .map(|x| (x - mean).powi(2))
        .sum::<f64>() / (values.len() - 1) as f64;

    variance.sqrt()
}

pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().min_by(|a, b| safe_float_cmp(*a, *b)).unwrap_or(f64::NAN)
}

pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().max_by(|a, b| safe_float_cmp(*a, *b)).unwrap_or(f64::NAN)
}

/// Percentile of an ascending slice, linearly interpolated between closest ranks
pub fn percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let index = (percentile / 100.0) * (sorted_values.len() as f64 - 1.0);
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        sorted_values[lower_index]
    } else {
        let lower_value = sorted_values[lower_index];
        let upper_value = sorted_values[upper_index];
        let weight = index - lower_index as f64;
        lower_value + weight * (upper_value - lower_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_mean_and_population_std_dev() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let m = mean(&values);
        assert_eq!(m, 3.0);
        assert!((population_std_dev(&values, m) - 2f64.sqrt()).abs() < EPSILON);
        assert!((sample_std_dev(&values, m) - 2.5f64.sqrt()).abs() < EPSILON);
    }

    #[test]
    fn test_sample_std_dev_single_value() {
        assert_eq!(sample_std_dev(&[4.2], 4.2), 0.0);
    }

    #[test]
    fn test_min_max() {
        let values = [3.0, -2.5, 7.25, 0.0];
        assert_eq!(min(&values), -2.5);
        assert_eq!(max(&values), 7.25);
    }

    #[test]
    fn test_percentile_calculation() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];

        assert_eq!(percentile(&values, 50.0), 5.5);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 10.0);
        assert!((percentile(&values, 90.0) - 9.1).abs() < EPSILON);
    }

    #[test]
    fn test_quartiles_of_skewed_sample() {
        let values = [1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 50.0];
        assert_eq!(percentile(&values, 25.0), 2.0);
        assert_eq!(percentile(&values, 75.0), 4.0);
        assert_eq!(median(&values), 3.0);
    }

    #[test]
    fn test_median_even_length() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[7.0]), 7.0);
    }
}
