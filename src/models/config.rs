//! Configuration data model and validation

use crate::config::EnvManager;
use crate::types::{AppError, FailurePolicy, Result, StatisticalMetric};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sampling cadence and budget
    #[serde(default)]
    pub testing: TestingConfig,

    /// Device table, keyed by ammeter type, in file order
    #[serde(default = "default_ammeters")]
    pub ammeters: AmmeterRegistry,

    /// Analyzer and ranker settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Where finished runs are archived
    #[serde(default)]
    pub result_management: ResultManagementConfig,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

/// `testing` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestingConfig {
    #[serde(default)]
    pub sampling: SamplingConfig,
}

/// `testing.sampling` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Target polling rate in Hz
    #[serde(default = "default_sampling_frequency")]
    pub sampling_frequency_hz: f64,

    /// Number of samples acquired per run
    #[serde(default = "default_measurements_count")]
    pub measurements_count: u32,

    /// Informational run length; not enforced
    #[serde(default = "default_total_duration")]
    pub total_duration_seconds: f64,

    /// Upper bound on a single device call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sampling_frequency_hz: default_sampling_frequency(),
            measurements_count: default_measurements_count(),
            total_duration_seconds: default_total_duration(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl SamplingConfig {
    /// Time between the starts of two consecutive samples
    pub fn period(&self) -> Result<Duration> {
        seconds_to_duration(1.0 / self.sampling_frequency_hz, "Sampling period")
    }

    /// Run length implied by the cadence and the sample budget
    pub fn expected_duration(&self) -> Result<Duration> {
        seconds_to_duration(self.measurements_count as f64 / self.sampling_frequency_hz, "Run length")
    }

    /// Request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Transport settings of one ammeter type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// TCP port the device (or its emulator) listens on
    pub port: u16,

    /// Command payload that triggers a reading
    pub command: String,

    /// Host the device listens on
    #[serde(default = "default_host")]
    pub host: String,
}

impl DeviceConfig {
    /// Create a device on the default host
    pub fn new(port: u16, command: impl Into<String>) -> Self {
        Self {
            port,
            command: command.into(),
            host: default_host(),
        }
    }

    /// `host:port` socket address string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Command payload as sent on the wire
    pub fn command_bytes(&self) -> &[u8] {
        self.command.as_bytes()
    }
}

/// Ordered device table. Order is the order device types are tested and ranked in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmmeterRegistry {
    devices: Vec<(String, DeviceConfig)>,
}

impl AmmeterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a device type, keeping its original position on replace
    pub fn insert(&mut self, device_type: impl Into<String>, device: DeviceConfig) {
        let device_type = device_type.into();
        match self.devices.iter_mut().find(|(name, _)| *name == device_type) {
            Some((_, existing)) => *existing = device,
            None => self.devices.push((device_type, device)),
        }
    }

    /// Look up a device type
    pub fn get(&self, device_type: &str) -> Option<&DeviceConfig> {
        self.devices
            .iter()
            .find(|(name, _)| name == device_type)
            .map(|(_, device)| device)
    }

    /// Device type keys in table order
    pub fn device_types(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate over `(device_type, device)` pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceConfig)> {
        self.devices.iter().map(|(name, device)| (name.as_str(), device))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Serialize for AmmeterRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.devices.len()))?;
        for (name, device) in &self.devices {
            map.serialize_entry(name, device)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AmmeterRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RegistryVisitor;

        impl<'de> Visitor<'de> for RegistryVisitor {
            type Value = AmmeterRegistry;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of ammeter type to device settings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut registry = AmmeterRegistry::new();
                while let Some((name, device)) = access.next_entry::<String, DeviceConfig>()? {
                    if registry.get(&name).is_some() {
                        return Err(de::Error::custom(format!("duplicate ammeter type '{}'", name)));
                    }
                    registry.devices.push((name, device));
                }
                Ok(registry)
            }
        }

        deserializer.deserialize_map(RegistryVisitor)
    }
}

/// `analysis` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Allow-list of descriptive statistics included in reports
    #[serde(default = "default_statistical_metrics")]
    pub statistical_metrics: Vec<StatisticalMetric>,

    /// Whether failed samples are dropped or analyzed as sentinels
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Score added per outlier when ranking devices
    #[serde(default = "default_outlier_penalty")]
    pub outlier_penalty: f64,

    #[serde(default)]
    pub visualization: VisualizationConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            statistical_metrics: default_statistical_metrics(),
            failure_policy: FailurePolicy::default(),
            outlier_penalty: default_outlier_penalty(),
            visualization: VisualizationConfig::default(),
        }
    }
}

/// `analysis.visualization` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualizationConfig {
    /// Render a reading histogram in the terminal report
    #[serde(default)]
    pub enabled: bool,
}

/// `result_management` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultManagementConfig {
    /// Root directory of the result archive
    #[serde(default = "default_save_path")]
    pub save_path: String,

    /// Write run reports to the archive
    #[serde(default = "default_archive_enabled")]
    pub enabled: bool,
}

impl Default for ResultManagementConfig {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            enabled: default_archive_enabled(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            testing: TestingConfig::default(),
            ammeters: default_ammeters(),
            analysis: AnalysisConfig::default(),
            result_management: ResultManagementConfig::default(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration document
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| AppError::config(format!("Invalid configuration file: {}", e)))
    }

    /// Sampling section shortcut
    pub fn sampling(&self) -> &SamplingConfig {
        &self.testing.sampling
    }

    /// Resolve a device type, failing with a configuration error when it is unknown
    pub fn device(&self, device_type: &str) -> Result<&DeviceConfig> {
        self.ammeters.get(device_type).ok_or_else(|| {
            AppError::config(format!("Ammeter type '{}' not found in configuration.", device_type))
        })
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        let sampling = self.sampling();

        if !sampling.sampling_frequency_hz.is_finite() || sampling.sampling_frequency_hz <= 0.0 {
            return Err(AppError::config(format!(
                "Sampling frequency must be a positive number of Hz, got {}",
                sampling.sampling_frequency_hz
            )));
        }

        if sampling.measurements_count == 0 {
            return Err(AppError::config("Measurements count must be greater than 0"));
        }

        sampling.period()?;
        sampling.expected_duration()?;

        if sampling.request_timeout_ms == 0 {
            return Err(AppError::config("Request timeout must be greater than 0"));
        }

        if !sampling.total_duration_seconds.is_finite() || sampling.total_duration_seconds < 0.0 {
            return Err(AppError::config("Total duration cannot be negative"));
        }

        for (name, device) in self.ammeters.iter() {
            if name.trim().is_empty() {
                return Err(AppError::config("Ammeter type cannot be empty"));
            }
            if device.port == 0 {
                return Err(AppError::config(format!("Ammeter '{}' has no port configured", name)));
            }
            if device.command.is_empty() {
                return Err(AppError::config(format!("Ammeter '{}' has an empty command", name)));
            }
            if device.host.trim().is_empty() {
                return Err(AppError::config(format!("Ammeter '{}' has an empty host", name)));
            }
        }

        let penalty = self.analysis.outlier_penalty;
        if !penalty.is_finite() || penalty < 0.0 {
            return Err(AppError::config(format!(
                "Outlier penalty must be a non-negative number, got {}",
                penalty
            )));
        }

        if self.result_management.enabled && self.result_management.save_path.trim().is_empty() {
            return Err(AppError::config("Result save path cannot be empty"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Some(frequency) = EnvManager::read_var("SAMPLING_FREQUENCY_HZ")? {
            self.testing.sampling.sampling_frequency_hz = frequency;
        }

        if let Some(count) = EnvManager::read_var("MEASUREMENTS_COUNT")? {
            self.testing.sampling.measurements_count = count;
        }

        if let Some(save_path) = EnvManager::read_var("RESULTS_SAVE_PATH")? {
            self.result_management.save_path = save_path;
        }

        if let Some(enable_color) = EnvManager::read_var("ENABLE_COLOR")? {
            self.enable_color = enable_color;
        }

        Ok(())
    }
}

/// NaN, negative and out-of-range second counts are configuration errors
fn seconds_to_duration(seconds: f64, what: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        AppError::config(format!("{} of {}s cannot be represented; raise the sampling frequency", what, seconds))
    })
}

// Default value functions for serde
fn default_sampling_frequency() -> f64 {
    crate::defaults::DEFAULT_SAMPLING_FREQUENCY_HZ
}

fn default_measurements_count() -> u32 {
    crate::defaults::DEFAULT_MEASUREMENTS_COUNT
}

fn default_total_duration() -> f64 {
    crate::defaults::DEFAULT_MEASUREMENTS_COUNT as f64 / crate::defaults::DEFAULT_SAMPLING_FREQUENCY_HZ
}

fn default_request_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

fn default_host() -> String {
    crate::defaults::DEFAULT_HOST.to_string()
}

fn default_ammeters() -> AmmeterRegistry {
    let mut registry = AmmeterRegistry::new();
    for &(name, port, command) in crate::defaults::DEFAULT_AMMETERS {
        registry.insert(name, DeviceConfig::new(port, command));
    }
    registry
}

fn default_statistical_metrics() -> Vec<StatisticalMetric> {
    StatisticalMetric::ALL.to_vec()
}

fn default_outlier_penalty() -> f64 {
    crate::defaults::DEFAULT_OUTLIER_PENALTY
}

fn default_save_path() -> String {
    crate::defaults::DEFAULT_SAVE_PATH.to_string()
}

fn default_archive_enabled() -> bool {
    true
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"{
        "testing": {
            "sampling": {
                "sampling_frequency_hz": 20,
                "measurements_count": 40,
                "total_duration_seconds": 2
            }
        },
        "ammeters": {
            "greenlee": { "port": 5000, "command": "MEASURE_GREENLEE -get_measurement" },
            "entes": { "port": 5001, "command": "MEASURE_ENTES -get_data" },
            "circutor": { "port": 5002, "command": "MEASURE_CIRCUTOR -get_measurement -current", "host": "10.0.0.7" }
        },
        "analysis": {
            "statistical_metrics": ["mean", "std_dev"],
            "visualization": { "enabled": true }
        },
        "result_management": { "save_path": "out/results" }
    }"#;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ammeters.len(), 3);
    }

    #[test]
    fn test_parse_full_document() {
        let config = Config::from_json_str(SAMPLE_CONFIG).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.sampling().sampling_frequency_hz, 20.0);
        assert_eq!(config.sampling().measurements_count, 40);
        assert_eq!(config.sampling().period().unwrap(), Duration::from_millis(50));
        assert_eq!(config.sampling().expected_duration().unwrap(), Duration::from_secs(2));
        assert_eq!(config.analysis.statistical_metrics, vec![StatisticalMetric::Mean, StatisticalMetric::StdDev]);
        assert!(config.analysis.visualization.enabled);
        assert_eq!(config.analysis.failure_policy, FailurePolicy::Exclude);
        assert_eq!(config.analysis.outlier_penalty, 0.1);
        assert_eq!(config.result_management.save_path, "out/results");
        assert!(config.result_management.enabled);
    }

    #[test]
    fn test_registry_preserves_file_order() {
        let config = Config::from_json_str(SAMPLE_CONFIG).unwrap();
        let order: Vec<&str> = config.ammeters.device_types().collect();
        assert_eq!(order, vec!["greenlee", "entes", "circutor"]);

        let circutor = config.device("circutor").unwrap();
        assert_eq!(circutor.address(), "10.0.0.7:5002");
        assert_eq!(config.device("greenlee").unwrap().host, "127.0.0.1");
    }

    #[test]
    fn test_registry_round_trips_through_json() {
        let config = Config::from_json_str(SAMPLE_CONFIG).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let reparsed = Config::from_json_str(&json).unwrap();
        assert_eq!(reparsed.ammeters, config.ammeters);
    }

    #[test]
    fn test_duplicate_device_type_rejected() {
        let doc = r#"{ "ammeters": {
            "greenlee": { "port": 5000, "command": "A" },
            "greenlee": { "port": 5001, "command": "B" }
        } }"#;
        let error = Config::from_json_str(doc).unwrap_err();
        assert!(error.to_string().contains("duplicate ammeter type"));
    }

    #[test]
    fn test_unknown_device_is_config_error() {
        let config = Config::default();
        let error = config.device("fluke").unwrap_err();
        assert!(matches!(error, AppError::Config(_)));
        assert!(error.to_string().contains("fluke"));
    }

    #[test]
    fn test_unknown_metric_rejected_at_parse() {
        let doc = r#"{ "analysis": { "statistical_metrics": ["mean", "mode"] } }"#;
        assert!(Config::from_json_str(doc).is_err());
    }

    #[test]
    fn test_zero_frequency_invalid() {
        let mut config = Config::default();
        config.testing.sampling.sampling_frequency_hz = 0.0;
        assert!(config.validate().is_err());

        config.testing.sampling.sampling_frequency_hz = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_period_invalid() {
        let mut config = Config::default();
        config.testing.sampling.sampling_frequency_hz = 1e-20;

        assert!(matches!(config.sampling().period(), Err(AppError::Config(_))));
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("Sampling period"));

        // A representable period can still imply an unrepresentable run
        config.testing.sampling.sampling_frequency_hz = 1e-10;
        config.testing.sampling.measurements_count = u32::MAX;
        assert!(config.sampling().period().is_ok());
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_measurements_invalid() {
        let mut config = Config::default();
        config.testing.sampling.measurements_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_penalty_invalid() {
        let mut config = Config::default();
        config.analysis.outlier_penalty = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_command_invalid() {
        let mut config = Config::default();
        config.ammeters.insert("greenlee", DeviceConfig::new(5000, ""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_registry_insert_replaces_in_place() {
        let mut registry = AmmeterRegistry::new();
        registry.insert("a", DeviceConfig::new(1, "x"));
        registry.insert("b", DeviceConfig::new(2, "y"));
        registry.insert("a", DeviceConfig::new(3, "z"));

        let order: Vec<&str> = registry.device_types().collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().port, 3);
    }
}
