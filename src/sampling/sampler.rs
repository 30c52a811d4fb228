//! Fixed-cadence producer loop

use super::{CancelToken, Sample};
use crate::client::{parse_reading, AmmeterClient};
use crate::error::Result;
use crate::logging::SamplingLogger;
use crate::models::DeviceConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// What a sampler task did before it returned
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSummary {
    pub acquired: u32,
    pub failed: u32,
    pub elapsed: Duration,
    /// False when the loop stopped early (cancelled, or the collector went away)
    pub completed: bool,
}

impl SamplerSummary {
    pub fn sent(&self) -> u32 {
        self.acquired + self.failed
    }
}

/// Polls one device `sample_count` times, one poll per period
pub struct Sampler {
    client: Arc<dyn AmmeterClient>,
    device_type: String,
    device: DeviceConfig,
    period: Duration,
    sample_count: u32,
    run_id: String,
    logger: SamplingLogger,
    cancel: CancelToken,
}

impl Sampler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<dyn AmmeterClient>,
        device_type: impl Into<String>,
        device: DeviceConfig,
        period: Duration,
        sample_count: u32,
        run_id: impl Into<String>,
        logger: SamplingLogger,
        cancel: CancelToken,
    ) -> Self {
        Self {
            client,
            device_type: device_type.into(),
            device,
            period,
            sample_count,
            run_id: run_id.into(),
            logger,
            cancel,
        }
    }

    async fn acquire_once(&self) -> Result<f64> {
        let raw = self.client.acquire(&self.device).await?;
        parse_reading(&raw)
    }

    /// Produce the sample budget onto `tx`.
    ///
    /// Sample `k` is due at `anchor + k * period`. Waiting for an absolute
    /// deadline absorbs call latency and keeps timer rounding from adding up
    /// across the run. A device call longer than a whole period moves the
    /// anchor to the moment it returned, so the samples after it are not
    /// fired back to back to make up the lost time.
    pub async fn run(self, tx: mpsc::Sender<Sample>) -> SamplerSummary {
        let run_start = Instant::now();
        let mut summary = SamplerSummary {
            acquired: 0,
            failed: 0,
            elapsed: Duration::ZERO,
            completed: false,
        };

        self.logger.log_run_start(
            &self.device_type,
            &self.run_id,
            &self.device.address(),
            self.sample_count,
            1.0 / self.period.as_secs_f64(),
        );

        let mut anchor = run_start;
        let mut slots_since_anchor: u32 = 0;

        for index in 0..self.sample_count {
            let iteration_start = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return self.stop(summary, run_start, "cancelled");
                }
                outcome = self.acquire_once() => outcome,
            };

            let sample = match outcome {
                Ok(value) => {
                    summary.acquired += 1;
                    self.logger.log_sample(
                        &self.device_type,
                        &self.run_id,
                        index,
                        value,
                        iteration_start.elapsed().as_secs_f64() * 1000.0,
                    );
                    Sample::Acquired(value)
                }
                Err(error) => {
                    summary.failed += 1;
                    self.logger.log_sample_failure(&self.device_type, &self.run_id, index, &error);
                    Sample::Failed(error.to_string())
                }
            };

            if tx.send(sample).await.is_err() {
                return self.stop(summary, run_start, "collector closed the channel");
            }

            if iteration_start.elapsed() > self.period {
                // Overran its own slot: restart the schedule from here
                anchor = Instant::now();
                slots_since_anchor = 0;
                continue;
            }

            slots_since_anchor += 1;
            let deadline = self
                .period
                .checked_mul(slots_since_anchor)
                .and_then(|offset| anchor.checked_add(offset));
            if let Some(deadline) = deadline.filter(|deadline| *deadline > Instant::now()) {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        return self.stop(summary, run_start, "cancelled");
                    }
                    _ = sleep_until(deadline) => {}
                }
            }
        }

        summary.elapsed = run_start.elapsed();
        summary.completed = true;
        self.logger.log_run_complete(&self.device_type, &self.run_id, summary.acquired, summary.failed, summary.elapsed);
        summary
    }

    fn stop(&self, mut summary: SamplerSummary, run_start: Instant, reason: &str) -> SamplerSummary {
        summary.elapsed = run_start.elapsed();
        self.logger.log_stopped(&self.device_type, &self.run_id, summary.sent(), reason);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::logging::{LogLevel, Logger};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Answers `1`, `2`, `3`, ... and fails every `fail_every`-th call
    struct CountingClient {
        calls: AtomicU32,
        fail_every: u32,
    }

    #[async_trait]
    impl AmmeterClient for CountingClient {
        async fn acquire(&self, _device: &DeviceConfig) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_every > 0 && call % self.fail_every == 0 {
                return Err(AppError::transport("connection reset"));
            }
            Ok(call.to_string())
        }
    }

    /// Takes the scripted latency for each call, then answers `1.0`; records when each call started
    struct ScriptedLatencyClient {
        latencies_ms: Vec<u64>,
        started: std::sync::Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl AmmeterClient for ScriptedLatencyClient {
        async fn acquire(&self, _device: &DeviceConfig) -> Result<String> {
            let call = {
                let mut started = self.started.lock().unwrap();
                started.push(Instant::now());
                started.len() - 1
            };
            let latency = self.latencies_ms.get(call).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(latency)).await;
            Ok("1.0".to_string())
        }
    }

    fn sampler(client: Arc<dyn AmmeterClient>, count: u32, logger: Logger, cancel: CancelToken) -> Sampler {
        Sampler::new(
            client,
            "greenlee",
            DeviceConfig::new(5000, "MEASURE"),
            Duration::from_millis(100),
            count,
            "run-1",
            SamplingLogger::new(logger),
            cancel,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_sends_budget_in_order() {
        let client = Arc::new(CountingClient { calls: AtomicU32::new(0), fail_every: 0 });
        let (tx, mut rx) = mpsc::channel(4);
        let handle = tokio::spawn(sampler(client, 5, Logger::quiet("T"), CancelToken::new()).run(tx));

        let mut values = Vec::new();
        while let Some(sample) = rx.recv().await {
            values.push(sample.value());
        }

        let summary = handle.await.unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(summary.completed);
        assert_eq!(summary.sent(), 5);
        assert_eq!(summary.elapsed, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_absorbed_by_the_schedule() {
        let client = Arc::new(ScriptedLatencyClient {
            latencies_ms: vec![30, 70, 10, 95],
            started: Default::default(),
        });
        let (tx, mut rx) = mpsc::channel(8);
        let run_start = Instant::now();
        let handle = tokio::spawn(sampler(client.clone(), 4, Logger::quiet("T"), CancelToken::new()).run(tx));
        while rx.recv().await.is_some() {}

        let summary = handle.await.unwrap();
        assert_eq!(summary.elapsed, Duration::from_millis(400));

        let offsets: Vec<Duration> = client.started.lock().unwrap().iter().map(|t| *t - run_start).collect();
        let expected: Vec<Duration> = [0, 100, 200, 300].iter().map(|ms| Duration::from_millis(*ms)).collect();
        assert_eq!(offsets, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_restarts_schedule_without_burst() {
        let client = Arc::new(ScriptedLatencyClient {
            latencies_ms: vec![250, 0, 0, 0],
            started: Default::default(),
        });
        let (tx, mut rx) = mpsc::channel(8);
        let run_start = Instant::now();
        let handle = tokio::spawn(sampler(client.clone(), 4, Logger::quiet("T"), CancelToken::new()).run(tx));
        while rx.recv().await.is_some() {}
        handle.await.unwrap();

        // The slow first call pushes the rest back; they keep a full period apart
        let offsets: Vec<Duration> = client.started.lock().unwrap().iter().map(|t| *t - run_start).collect();
        let expected: Vec<Duration> = [0, 250, 350, 450].iter().map(|ms| Duration::from_millis(*ms)).collect();
        assert_eq!(offsets, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_tags_failures_and_keeps_going() {
        let client = Arc::new(CountingClient { calls: AtomicU32::new(0), fail_every: 2 });
        let (logger, capture) = Logger::capturing("T");
        let (tx, mut rx) = mpsc::channel(8);
        let handle = tokio::spawn(sampler(client, 4, logger, CancelToken::new()).run(tx));

        let mut samples = Vec::new();
        while let Some(sample) = rx.recv().await {
            samples.push(sample);
        }

        let summary = handle.await.unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], Sample::Acquired(1.0));
        assert!(matches!(samples[1], Sample::Failed(_)));
        assert_eq!(summary.acquired, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(capture.at_level(LogLevel::Error).len(), 2);
        assert_eq!(capture.at_level(LogLevel::Debug).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_stops_when_receiver_dropped() {
        let client = Arc::new(CountingClient { calls: AtomicU32::new(0), fail_every: 0 });
        let (tx, mut rx) = mpsc::channel(1);
        let handle = tokio::spawn(sampler(client, 10, Logger::quiet("T"), CancelToken::new()).run(tx));

        assert!(rx.recv().await.is_some());
        drop(rx);

        let summary = handle.await.unwrap();
        assert!(!summary.completed);
        assert!(summary.sent() < 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_honours_cancellation_during_sleep() {
        let client = Arc::new(CountingClient { calls: AtomicU32::new(0), fail_every: 0 });
        let cancel = CancelToken::new();
        let (tx, mut rx) = mpsc::channel(8);
        let handle = tokio::spawn(sampler(client, 100, Logger::quiet("T"), cancel.clone()).run(tx));

        assert!(rx.recv().await.is_some());
        cancel.cancel();

        let summary = handle.await.unwrap();
        assert!(!summary.completed);
        assert!(summary.elapsed < Duration::from_secs(1));
    }
}
