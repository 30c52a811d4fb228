//! Configuration validation beyond the hard constraints in `Config::validate`

use crate::{
    error::Result,
    models::Config,
    types::StatisticalMetric,
};

/// Frequencies above this rarely suit a request/response ammeter
const HIGH_FREQUENCY_HZ: f64 = 50.0;

/// Relative tolerance between the advisory duration and count / frequency
const DURATION_TOLERANCE: f64 = 0.05;

/// Configuration validator producing advisory warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run the hard checks, then collect warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_sampling(config));
        warnings.extend(Self::validate_devices(config));
        warnings.extend(Self::validate_analysis(config));
        Ok(warnings)
    }

    fn validate_sampling(config: &Config) -> Vec<ValidationWarning> {
        let sampling = config.sampling();
        let mut warnings = Vec::new();

        let implied = sampling.measurements_count as f64 / sampling.sampling_frequency_hz;
        let advisory = sampling.total_duration_seconds;
        if advisory > 0.0 && ((implied - advisory).abs() / advisory) > DURATION_TOLERANCE {
            warnings.push(ValidationWarning::warning(
                format!(
                    "total_duration_seconds is {}s but {} samples at {} Hz take {:.2}s; the sample count wins",
                    advisory, sampling.measurements_count, sampling.sampling_frequency_hz, implied
                ),
            ));
        }

        if sampling.sampling_frequency_hz > HIGH_FREQUENCY_HZ {
            warnings.push(ValidationWarning::warning(
                format!(
                    "Sampling frequency of {} Hz leaves {:.1}ms per request; slow devices will drift",
                    sampling.sampling_frequency_hz,
                    1000.0 / sampling.sampling_frequency_hz
                ),
            ));
        }

        if sampling.request_timeout().as_secs_f64() > 1.0 / sampling.sampling_frequency_hz {
            warnings.push(ValidationWarning::info(
                format!(
                    "Request timeout of {}ms exceeds the sampling period; a hung device delays the next sample",
                    sampling.request_timeout_ms
                ),
            ));
        }

        if (sampling.measurements_count as usize) < crate::defaults::MIN_NORMALITY_SAMPLES {
            warnings.push(ValidationWarning::info(
                format!(
                    "{} samples per run is too few for the normality test (needs >= 8)",
                    sampling.measurements_count
                ),
            ));
        }

        warnings
    }

    fn validate_devices(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.ammeters.is_empty() {
            warnings.push(ValidationWarning::warning(
                "No ammeters configured; there is nothing to test".to_string(),
            ));
        }

        let mut seen: Vec<String> = Vec::new();
        for (name, device) in config.ammeters.iter() {
            let address = device.address();
            if seen.contains(&address) {
                warnings.push(ValidationWarning::warning(
                    format!("Ammeter '{}' shares address {} with another device", name, address),
                ));
            } else {
                seen.push(address);
            }
        }

        warnings
    }

    fn validate_analysis(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let metrics = &config.analysis.statistical_metrics;

        if !metrics.contains(&StatisticalMetric::StdDev) {
            warnings.push(ValidationWarning::warning(
                "std_dev is not in analysis.statistical_metrics; devices cannot be ranked".to_string(),
            ));
        }

        if metrics.is_empty() {
            warnings.push(ValidationWarning::info(
                "No statistical metrics enabled; reports carry only shape statistics".to_string(),
            ));
        }

        if config.analysis.outlier_penalty == 0.0 {
            warnings.push(ValidationWarning::info(
                "Outlier penalty is 0; ranking uses precision only".to_string(),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> colored::Color {
        match self {
            Self::Info => colored::Color::Blue,
            Self::Warning => colored::Color::Yellow,
            Self::Error => colored::Color::Red,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    fn warning(message: String) -> Self {
        Self::new(ValidationLevel::Warning, message)
    }

    fn info(message: String) -> Self {
        Self::new(ValidationLevel::Info, message)
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        use colored::Colorize;

        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            format!("{} {}", tag.color(self.level.color()), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::DeviceConfig;

    fn messages(config: &Config) -> Vec<String> {
        validate_config(config).unwrap().into_iter().map(|w| w.message).collect()
    }

    #[test]
    fn test_default_config_is_quiet() {
        let warnings = validate_config(&Config::default()).unwrap();
        assert!(
            warnings.iter().all(|w| w.level != ValidationLevel::Warning),
            "unexpected warnings: {:?}",
            warnings
        );
    }

    #[test]
    fn test_duration_mismatch_warned() {
        let mut config = Config::default();
        config.testing.sampling.total_duration_seconds = 60.0;
        assert!(messages(&config).iter().any(|m| m.contains("the sample count wins")));

        config.testing.sampling.total_duration_seconds = 0.0;
        assert!(!messages(&config).iter().any(|m| m.contains("the sample count wins")));
    }

    #[test]
    fn test_high_frequency_warned() {
        let mut config = Config::default();
        config.testing.sampling.sampling_frequency_hz = 200.0;
        config.testing.sampling.total_duration_seconds = 0.0;
        assert!(messages(&config).iter().any(|m| m.contains("200 Hz")));
    }

    #[test]
    fn test_empty_device_table_warned() {
        let mut config = Config::default();
        config.ammeters = Default::default();
        assert!(messages(&config).iter().any(|m| m.contains("No ammeters configured")));
    }

    #[test]
    fn test_shared_address_warned() {
        let mut config = Config::default();
        config.ammeters.insert("twin", DeviceConfig::new(5000, "MEASURE"));
        assert!(messages(&config).iter().any(|m| m.contains("'twin' shares address")));
    }

    #[test]
    fn test_missing_std_dev_warned() {
        let mut config = Config::default();
        config.analysis.statistical_metrics = vec![StatisticalMetric::Mean];
        assert!(messages(&config).iter().any(|m| m.contains("cannot be ranked")));
    }

    #[test]
    fn test_hard_errors_still_fail() {
        let mut config = Config::default();
        config.testing.sampling.measurements_count = 0;
        assert!(matches!(validate_config(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_warning_format() {
        let warning = ValidationWarning::new(ValidationLevel::Warning, "careful".to_string());
        assert_eq!(warning.format(false), "[WARNING] careful");
        assert_eq!(ValidationLevel::Info.as_str(), "INFO");
    }
}
