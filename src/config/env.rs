//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env from the current directory if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists; variables already set win
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {} file: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Ammeter Tester Configuration
#
# Values here are read before the configuration file's settings are
# overridden from the environment. Command-line arguments still win.

# Configuration file to load
# AMMETER_CONFIG=config/test_config.json

# Sampling frequency in Hz
# SAMPLING_FREQUENCY_HZ=10

# Samples taken per run
# MEASUREMENTS_COUNT=100

# Directory that receives the result archive
# RESULTS_SAVE_PATH=results

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "AMMETER_CONFIG" => {
                if value.trim().is_empty() {
                    return Err(AppError::config("AMMETER_CONFIG cannot be empty"));
                }
            }
            "SAMPLING_FREQUENCY_HZ" => {
                let hz: f64 = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid SAMPLING_FREQUENCY_HZ value '{}': {}", value, e)))?;
                if !hz.is_finite() || hz <= 0.0 {
                    return Err(AppError::config(format!("SAMPLING_FREQUENCY_HZ must be positive, got: {}", value)));
                }
                if std::time::Duration::try_from_secs_f64(1.0 / hz).is_err() {
                    return Err(AppError::config(format!("SAMPLING_FREQUENCY_HZ {} is too low to schedule", value)));
                }
            }
            "MEASUREMENTS_COUNT" => {
                let count: u32 = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid MEASUREMENTS_COUNT value '{}': {}", value, e)))?;
                if count == 0 {
                    return Err(AppError::config("MEASUREMENTS_COUNT must be greater than 0"));
                }
            }
            "RESULTS_SAVE_PATH" => {
                if value.trim().is_empty() {
                    return Err(AppError::config("RESULTS_SAVE_PATH cannot be empty"));
                }
            }
            "ENABLE_COLOR" => {
                value.trim().parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Supported variables: name, description, example
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("AMMETER_CONFIG", "Path to the JSON configuration file", "config/test_config.json"),
            ("SAMPLING_FREQUENCY_HZ", "Sampling frequency in Hz", "10"),
            ("MEASUREMENTS_COUNT", "Samples taken per run", "100"),
            ("RESULTS_SAVE_PATH", "Directory that receives the result archive", "results"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<22} {}\n", var, description));
            help.push_str(&format!("  {:<22} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Configuration file\n");
        help.push_str("  5. Default values\n\n");

        help.push_str("Example .env file:\n\n");
        help.push_str(&Self::create_example_env_content());

        help
    }

    /// Read a set variable, validate it, then parse it
    pub fn read_var<T>(key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        match std::env::var(key) {
            Ok(value) => Self::parse_var(key, &value).map(Some),
            Err(_) => Ok(None),
        }
    }

    fn parse_var<T>(key: &str, value: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        Self::validate_env_var(key, value)?;
        value.trim().parse()
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
    }
}
