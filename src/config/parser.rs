//! Configuration loading: defaults, .env, JSON file, environment and CLI

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::Config,
};
use std::path::{Path, PathBuf};

/// Builds the effective configuration for one invocation
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        EnvManager::load_env_file(self.cli.debug)?;

        let mut config = match self.config_path() {
            ConfigSource::Explicit(path) => load_config_file(&path)?,
            ConfigSource::Default(path) if path.exists() => load_config_file(&path)?,
            ConfigSource::Default(_) => Config::default(),
        };

        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// `--config`, then `AMMETER_CONFIG` (possibly from .env), then the default path
    fn config_path(&self) -> ConfigSource {
        if let Some(ref path) = self.cli.config {
            return ConfigSource::Explicit(path.clone());
        }
        match std::env::var("AMMETER_CONFIG") {
            Ok(path) if !path.trim().is_empty() => ConfigSource::Explicit(PathBuf::from(path.trim())),
            _ => ConfigSource::Default(PathBuf::from(crate::defaults::DEFAULT_CONFIG_PATH)),
        }
    }

    fn apply_cli_overrides(&self, config: &mut Config) {
        if let Some(count) = self.cli.count {
            config.testing.sampling.measurements_count = count;
        }

        if let Some(frequency) = self.cli.frequency {
            config.testing.sampling.sampling_frequency_hz = frequency;
        }

        if self.cli.no_save {
            config.result_management.enabled = false;
        }

        if self.cli.no_color {
            config.enable_color = false;
        } else if self.cli.color {
            config.enable_color = true;
        }

        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            eprintln!(
                "Final config: frequency={} Hz, count={}, save={}, enable_color={}",
                config.sampling().sampling_frequency_hz,
                config.sampling().measurements_count,
                config.result_management.enabled,
                config.enable_color
            );
        }
    }
}

enum ConfigSource {
    Explicit(PathBuf),
    Default(PathBuf),
}

/// Read and parse a JSON configuration file
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("Failed to read configuration file '{}': {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::config(format!("Invalid configuration file '{}': {}", path.display(), e)))
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let sampling = config.sampling();
    let mut summary = Vec::new();

    summary.push(format!(
        "Devices: {}",
        config.ammeters.device_types().collect::<Vec<_>>().join(", ")
    ));
    summary.push(format!("Sampling Frequency: {} Hz", sampling.sampling_frequency_hz));
    summary.push(format!("Measurements per Run: {}", sampling.measurements_count));
    summary.push(format!("Request Timeout: {}ms", sampling.request_timeout_ms));
    summary.push(format!(
        "Metrics: {}",
        config.analysis.statistical_metrics.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
    ));
    summary.push(format!("Failure Policy: {:?}", config.analysis.failure_policy));
    summary.push(format!("Outlier Penalty: {}", config.analysis.outlier_penalty));
    summary.push(format!(
        "Archive: {}",
        if config.result_management.enabled {
            config.result_management.save_path.clone()
        } else {
            "disabled".to_string()
        }
    ));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config_file() {
        let file = config_file(r#"{
            "testing": { "sampling": { "sampling_frequency_hz": 4, "measurements_count": 8 } },
            "ammeters": { "bench": { "port": 6000, "command": "READ" } }
        }"#);

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.sampling().sampling_frequency_hz, 4.0);
        assert_eq!(config.sampling().measurements_count, 8);
        assert_eq!(config.device("bench").unwrap().port, 6000);
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let error = load_config_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(error, AppError::Config(_)));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let file = config_file("{ not json");
        assert!(matches!(load_config_file(file.path()), Err(AppError::Config(_))));
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let file = config_file(r#"{ "testing": { "sampling": { "sampling_frequency_hz": 4, "measurements_count": 8 } } }"#);
        let path = file.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from(["amt", "--config", &path, "--count", "3", "--frequency", "50", "--no-save", "--no-color"]);

        let mut config = load_config_file(file.path()).unwrap();
        ConfigParser::new(cli).apply_cli_overrides(&mut config);

        assert_eq!(config.sampling().measurements_count, 3);
        assert_eq!(config.sampling().sampling_frequency_hz, 50.0);
        assert!(!config.result_management.enabled);
        assert!(!config.enable_color);
    }

    #[test]
    fn test_explicit_path_wins() {
        let cli = Cli::parse_from(["amt", "--config", "custom.json"]);
        match ConfigParser::new(cli).config_path() {
            ConfigSource::Explicit(path) => assert_eq!(path, PathBuf::from("custom.json")),
            ConfigSource::Default(_) => panic!("expected the --config path"),
        }
    }

    #[test]
    fn test_config_summary() {
        let summary = display_config_summary(&Config::default());
        assert!(summary.contains("Devices: greenlee, entes, circutor"));
        assert!(summary.contains("Sampling Frequency: 10 Hz"));
        assert!(summary.contains("Outlier Penalty: 0.1"));
        assert!(summary.contains("Archive: results"));
    }
}
