//! Timed acquisition pipeline
//!
//! A [`Sampler`] task polls one device at a fixed cadence and pushes tagged
//! samples onto a bounded channel; the [`DataCollector`] drains that channel
//! into the run's measurement sequence. Each run owns its own channel and
//! sampler task.

pub mod collector;
pub mod sampler;

pub use collector::DataCollector;
pub use sampler::{Sampler, SamplerSummary};

use crate::models::Measurement;
use crate::types::SampleStatus;
use std::sync::Arc;
use tokio::sync::watch;

/// Outcome of one acquisition, as sent from sampler to collector
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Acquired(f64),
    /// Transport failure, timeout or unparsable answer
    Failed(String),
}

impl Sample {
    /// Numeric value; failed samples carry the sentinel
    pub fn value(&self) -> f64 {
        match self {
            Sample::Acquired(value) => *value,
            Sample::Failed(_) => crate::defaults::SENTINEL_VALUE,
        }
    }

    pub fn status(&self) -> SampleStatus {
        match self {
            Sample::Acquired(_) => SampleStatus::Acquired,
            Sample::Failed(_) => SampleStatus::Failed,
        }
    }

    /// Stamp the sample with the current time and its run id
    pub fn into_measurement(self, run_id: &str) -> Measurement {
        match self {
            Sample::Acquired(value) => Measurement::acquired(value, run_id),
            Sample::Failed(reason) => Measurement::failed(reason, run_id),
        }
    }
}

/// Cooperative cancellation shared by the orchestrator, collector and sampler
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender: Arc::new(sender) }
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
