//! On-disk result archive
//!
//! Layout under the configured save path:
//!
//! ```text
//! <save_path>/archive/<device_type>/<run_id>/statistical_report.json
//! <save_path>/archive/comparison_<timestamp>.json
//! ```

use crate::{
    error::{AppError, Result},
    logging::Logger,
    models::{DeviceComparison, TestRunResult},
};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const ARCHIVE_DIR: &str = "archive";
const RUN_REPORT_FILE: &str = "statistical_report.json";

/// Writes finished runs and batch comparisons as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct ResultArchive {
    root: PathBuf,
    logger: Logger,
}

impl ResultArchive {
    pub fn new(save_path: impl AsRef<Path>, logger: Logger) -> Self {
        Self {
            root: save_path.as_ref().join(ARCHIVE_DIR),
            logger: logger.named("ARCHIVE"),
        }
    }

    /// `<save_path>/archive`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one run's files
    pub fn run_dir(&self, device_type: &str, run_id: &str) -> PathBuf {
        self.root.join(device_type).join(run_id)
    }

    /// Save the whole run record; returns the report path
    pub fn save_run(&self, run: &TestRunResult) -> Result<PathBuf> {
        let dir = self.run_dir(run.device_type(), run.run_id());
        let path = dir.join(RUN_REPORT_FILE);
        self.write_json(&path, run)?;

        self.logger.info(&format!("Saved {} run report to {}", run.device_type(), path.display()))
            .correlation_id(run.run_id())
            .field("device_type", run.device_type())
            .field("path", path.display().to_string())
            .log();

        Ok(path)
    }

    /// Save a batch comparison under a timestamped name; returns its path
    pub fn save_comparison(&self, comparison: &DeviceComparison) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let path = self.root.join(format!("comparison_{}.json", stamp));
        self.write_json(&path, comparison)?;

        self.logger.info(&format!("Saved device comparison to {}", path.display()))
            .field("best_device", &comparison.best_device)
            .field("path", path.display().to_string())
            .log();

        Ok(path)
    }

    /// Read a previously saved run
    pub fn load_run(&self, device_type: &str, run_id: &str) -> Result<TestRunResult> {
        self.read_json(&self.run_dir(device_type, run_id).join(RUN_REPORT_FILE))
    }

    /// Run ids archived for a device type, sorted
    pub fn list_runs(&self, device_type: &str) -> Result<Vec<String>> {
        let dir = self.root.join(device_type);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir)
            .map_err(|e| AppError::io(format!("Failed to list '{}': {}", dir.display(), e)))?;

        let mut runs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AppError::io(format!("Failed to list '{}': {}", dir.display(), e)))?;
            if entry.path().join(RUN_REPORT_FILE).is_file() {
                runs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        runs.sort();
        Ok(runs)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io(format!("Failed to create archive directory '{}': {}", parent.display(), e)))?;
        }

        let content = serde_json::to_string_pretty(value)
            .map_err(|e| AppError::internal(format!("Failed to serialize archive entry: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| AppError::io(format!("Failed to write '{}': {}", path.display(), e)))
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("Failed to read '{}': {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::parse(format!("Failed to parse '{}': {}", path.display(), e)))
    }
}
