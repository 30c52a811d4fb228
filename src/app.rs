//! Main application orchestration and execution

use crate::{
    client::{AmmeterClient, TcpAmmeterClient},
    error::Result,
    log_info, log_warn,
    logging::{ErrorEventLogger, Logger, LoggerFactory},
    models::{Config, DeviceComparison, TestRunResult},
    ranking::DeviceRanker,
    sampling::{CancelToken, DataCollector},
    stats::ResultAnalyzer,
    storage::ResultArchive,
};
use std::sync::Arc;
use uuid::Uuid;

/// Runs sampling, analysis and archiving for configured devices, one device at a time
pub struct TestFramework {
    config: Arc<Config>,
    collector: DataCollector,
    analyzer: ResultAnalyzer,
    ranker: DeviceRanker,
    archive: Option<ResultArchive>,
    loggers: LoggerFactory,
    logger: Logger,
    errors: ErrorEventLogger,
}

impl TestFramework {
    /// Framework talking to real devices over TCP
    pub fn new(config: Config) -> Self {
        let client = TcpAmmeterClient::with_timeout(config.sampling().request_timeout());
        Self::with_client(config, Arc::new(client))
    }

    /// Framework with a caller-supplied device client
    pub fn with_client(config: Config, client: Arc<dyn AmmeterClient>) -> Self {
        let loggers = LoggerFactory::new(&config);
        Self::with_logger(config, client, loggers)
    }

    /// Framework whose components log through `loggers`
    pub fn with_logger(config: Config, client: Arc<dyn AmmeterClient>, loggers: LoggerFactory) -> Self {
        let config = Arc::new(config);
        let logger = loggers.create_logger("FRAMEWORK");

        let archive = config
            .result_management
            .enabled
            .then(|| ResultArchive::new(&config.result_management.save_path, logger.clone()));

        Self {
            collector: DataCollector::new(client, Arc::clone(&config), loggers.create_logger("COLLECTOR")),
            analyzer: ResultAnalyzer::from_config(&config.analysis, loggers.create_logger("ANALYSIS")),
            ranker: DeviceRanker::new(config.analysis.outlier_penalty, loggers.create_logger("RANKING")),
            errors: loggers.create_error_logger(),
            archive,
            loggers,
            logger,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Batch id shared by every log entry of this framework
    pub fn session_id(&self) -> &str {
        self.loggers.session_id()
    }

    pub fn archive(&self) -> Option<&ResultArchive> {
        self.archive.as_ref()
    }

    /// Whether run summaries should carry a histogram
    pub fn show_histogram(&self) -> bool {
        self.config.analysis.visualization.enabled
    }

    /// Device types in configuration order
    pub fn device_types(&self) -> Vec<String> {
        self.config.ammeters.device_types().map(str::to_string).collect()
    }

    /// Sample, analyze and archive one device.
    ///
    /// An unknown device type fails before anything is sampled. A run whose
    /// analysis has nothing to work with still completes, with no report.
    pub async fn run_test(&self, device_type: &str, cancel: &CancelToken) -> Result<TestRunResult> {
        if let Err(error) = self.config.device(device_type) {
            self.errors.log_error(&error, Some("run_test"), None);
            return Err(error);
        }

        let run_id = Uuid::new_v4().to_string();
        let mut perf = self.loggers.create_performance_logger();
        perf.start_timing(&run_id);

        log_info!(self.logger, "Starting {} run {}", device_type, run_id);
        let run = TestRunResult::new(device_type, &run_id, self.config.sampling());

        let measurements = match self.collector.collect_measurements(device_type, &run_id, cancel).await {
            Ok(measurements) => measurements,
            Err(error) => {
                self.errors.log_error(&error, Some(device_type), Some(&run_id));
                return Err(error);
            }
        };

        let analysis = self.analyzer.analyze(&measurements);
        let run = run.finalize(measurements, analysis);

        if let Some(ref archive) = self.archive {
            // The run is returned even when it cannot be written
            if let Err(error) = archive.save_run(&run) {
                self.errors.log_error(&error, Some("archive"), Some(&run_id));
            }
        }

        perf.end_timing(&run_id);
        Ok(run)
    }

    /// Run every configured device in order
    pub async fn run_all(&self, cancel: &CancelToken) -> Result<Vec<TestRunResult>> {
        self.run_devices(&self.device_types(), cancel).await
    }

    /// Run the named devices in order; the first error stops the batch
    pub async fn run_devices(&self, device_types: &[String], cancel: &CancelToken) -> Result<Vec<TestRunResult>> {
        let mut runs = Vec::with_capacity(device_types.len());
        for device_type in device_types {
            runs.push(self.run_test(device_type, cancel).await?);
        }
        Ok(runs)
    }

    /// Rank finished runs and archive the comparison
    pub fn compare_devices(&self, runs: &[TestRunResult]) -> Result<DeviceComparison> {
        let comparison = self.ranker.rank_runs(runs)?;

        if let Some(ref archive) = self.archive {
            if let Err(error) = archive.save_comparison(&comparison) {
                log_warn!(self.logger, "Comparison not archived: {}", error);
            }
        }

        Ok(comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::DeviceConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every request with the same reading and counts calls
    struct FixedDevice {
        reading: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AmmeterClient for FixedDevice {
        async fn acquire(&self, _device: &DeviceConfig) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reading.to_string())
        }
    }

    fn config(save_path: &std::path::Path, count: u32) -> Config {
        let mut config = Config::default();
        config.testing.sampling.measurements_count = count;
        config.testing.sampling.sampling_frequency_hz = 100.0;
        config.result_management.save_path = save_path.to_string_lossy().into_owned();
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_test_finalizes_and_archives() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(FixedDevice { reading: "2.5", calls: AtomicUsize::new(0) });
        let framework = TestFramework::with_client(config(dir.path(), 10), client.clone());

        let run = framework.run_test("greenlee", &CancelToken::new()).await.unwrap();

        assert!(run.is_finalized());
        assert_eq!(run.measurements.len(), 10);
        assert_eq!(client.calls.load(Ordering::SeqCst), 10);
        assert_eq!(run.analysis.as_ref().unwrap().mean, Some(2.5));

        let archived = framework.archive().unwrap().load_run("greenlee", run.run_id()).unwrap();
        assert_eq!(archived.measurements.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_device_never_samples() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(FixedDevice { reading: "1.0", calls: AtomicUsize::new(0) });
        let framework = TestFramework::with_client(config(dir.path(), 5), client.clone());

        let error = framework.run_test("fluke", &CancelToken::new()).await.unwrap_err();
        assert!(matches!(error, AppError::Config(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_then_compare() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(FixedDevice { reading: "1.0", calls: AtomicUsize::new(0) });
        let framework = TestFramework::with_client(config(dir.path(), 4), client);

        let runs = framework.run_all(&CancelToken::new()).await.unwrap();
        assert_eq!(
            runs.iter().map(|r| r.device_type()).collect::<Vec<_>>(),
            vec!["greenlee", "entes", "circutor"]
        );

        // Identical devices tie; the first configured wins
        let comparison = framework.compare_devices(&runs).unwrap();
        assert_eq!(comparison.best_device, "greenlee");
    }

    #[tokio::test(start_paused = true)]
    async fn test_archive_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), 2);
        config.result_management.enabled = false;
        let client = Arc::new(FixedDevice { reading: "1.0", calls: AtomicUsize::new(0) });
        let framework = TestFramework::with_client(config, client);

        framework.run_test("entes", &CancelToken::new()).await.unwrap();
        assert!(framework.archive().is_none());
        assert!(!dir.path().join("archive").exists());
    }
}
