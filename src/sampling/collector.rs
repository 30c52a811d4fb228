//! Consumer side of a sampling run

use super::{CancelToken, Sampler};
use crate::client::AmmeterClient;
use crate::error::{AppError, Result};
use crate::logging::{Logger, SamplingLogger};
use crate::models::{Config, Measurement};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Runs a sampler task per call and assembles its measurement sequence
pub struct DataCollector {
    client: Arc<dyn AmmeterClient>,
    config: Arc<Config>,
    logger: Logger,
}

impl DataCollector {
    pub fn new(client: Arc<dyn AmmeterClient>, config: Arc<Config>, logger: Logger) -> Self {
        Self { client, config, logger }
    }

    /// Sample `device_type` for the configured budget.
    ///
    /// Fails with a configuration error, before any task is spawned, when the
    /// device type is unknown. Returns a `Cancelled` error when the run stops
    /// short of its budget.
    pub async fn collect_measurements(
        &self,
        device_type: &str,
        run_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Measurement>> {
        let device = self.config.device(device_type)?.clone();
        let sampling = self.config.sampling();
        let period = sampling.period()?;
        let expected = sampling.measurements_count as usize;

        let (tx, mut rx) = mpsc::channel(crate::defaults::CHANNEL_CAPACITY);
        let sampler = Sampler::new(
            Arc::clone(&self.client),
            device_type,
            device,
            period,
            sampling.measurements_count,
            run_id,
            SamplingLogger::new(self.logger.clone()),
            cancel.clone(),
        );
        let handle = tokio::spawn(sampler.run(tx));

        let mut measurements = Vec::with_capacity(expected);
        while measurements.len() < expected {
            match rx.recv().await {
                Some(sample) => measurements.push(sample.into_measurement(run_id)),
                None => break,
            }
        }
        drop(rx);

        let summary = handle.await?;

        if measurements.len() < expected {
            return Err(AppError::cancelled(format!(
                "{} run {} stopped after {} of {} samples",
                device_type,
                run_id,
                measurements.len(),
                expected
            )));
        }

        self.logger.debug(&format!("Collected {} measurements from {}", measurements.len(), device_type))
            .correlation_id(run_id)
            .field("device_type", device_type)
            .field("failed", summary.failed)
            .field("elapsed_seconds", summary.elapsed.as_secs_f64())
            .log();

        Ok(measurements)
    }
}
