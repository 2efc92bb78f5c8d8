//! Timing collaborator shared by the driver and benchmark cases
//!
//! Cases only call `start`/`stop` around their measured region and query the
//! mean duration to derive throughput. The driver owns the timer and reads
//! the full [`TimingSummary`] for reporting.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::warn;

/// Handle for one named measurement series
pub type TimerId = usize;

/// Stopwatch interface consumed by benchmark cases
pub trait Timer: Send + Sync {
    /// Create a new measurement series
    fn register(&self, label: &str) -> TimerId;

    /// Begin a measurement
    fn start(&self, id: TimerId);

    /// End the current measurement and record its duration
    fn stop(&self, id: TimerId);

    /// Mean recorded duration in nanoseconds, 0 if nothing was recorded
    fn elapsed_ns(&self, id: TimerId) -> f64;

    /// Discard all samples of a series
    fn reset(&self, id: TimerId);

    /// Statistics over all samples of a series, `None` for an unknown id
    fn summary(&self, id: TimerId) -> Option<TimingSummary>;
}

/// Summary statistics of one measurement series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    pub label: String,
    pub samples: usize,
    pub mean_ns: f64,
    pub median_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
    pub std_dev_ns: f64,
}

#[derive(Debug, Default)]
struct Series {
    label: String,
    started: Option<Instant>,
    samples_ns: Vec<f64>,
}

/// Wall-clock timer that keeps every sample for later statistics
#[derive(Debug, Default)]
pub struct StatisticalTimer {
    series: Mutex<Vec<Series>>,
}

impl StatisticalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Series>> {
        self.series.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an externally measured duration
    pub fn record(&self, id: TimerId, duration_ns: f64) {
        match self.lock().get_mut(id) {
            Some(series) => series.samples_ns.push(duration_ns),
            None => warn!(id, "record on unknown timer id"),
        }
    }

    /// Number of samples recorded for a series
    pub fn sample_count(&self, id: TimerId) -> usize {
        self.lock().get(id).map_or(0, |s| s.samples_ns.len())
    }
}

impl Timer for StatisticalTimer {
    fn register(&self, label: &str) -> TimerId {
        let mut guard = self.lock();
        guard.push(Series {
            label: label.to_string(),
            ..Series::default()
        });
        guard.len() - 1
    }

    fn start(&self, id: TimerId) {
        match self.lock().get_mut(id) {
            Some(series) => series.started = Some(Instant::now()),
            None => warn!(id, "start on unknown timer id"),
        }
    }

    fn stop(&self, id: TimerId) {
        let stopped = Instant::now();
        let mut guard = self.lock();
        let Some(series) = guard.get_mut(id) else {
            warn!(id, "stop on unknown timer id");
            return;
        };
        match series.started.take() {
            Some(started) => series
                .samples_ns
                .push(stopped.duration_since(started).as_nanos() as f64),
            None => warn!(id, label = %series.label, "stop without matching start ignored"),
        }
    }

    fn elapsed_ns(&self, id: TimerId) -> f64 {
        let guard = self.lock();
        match guard.get(id) {
            Some(series) if !series.samples_ns.is_empty() => series.samples_ns.iter().mean(),
            _ => 0.0,
        }
    }

    fn reset(&self, id: TimerId) {
        if let Some(series) = self.lock().get_mut(id) {
            series.samples_ns.clear();
            series.started = None;
        }
    }

    fn summary(&self, id: TimerId) -> Option<TimingSummary> {
        let guard = self.lock();
        let series = guard.get(id)?;
        let samples = &series.samples_ns;
        if samples.is_empty() {
            return Some(TimingSummary {
                label: series.label.clone(),
                samples: 0,
                mean_ns: 0.0,
                median_ns: 0.0,
                min_ns: 0.0,
                max_ns: 0.0,
                std_dev_ns: 0.0,
            });
        }
        let min_ns = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ns = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let std_dev_ns = if samples.len() > 1 {
            samples.iter().std_dev()
        } else {
            0.0
        };
        Some(TimingSummary {
            label: series.label.clone(),
            samples: samples.len(),
            mean_ns: samples.iter().mean(),
            median_ns: Data::new(samples.clone()).median(),
            min_ns,
            max_ns,
            std_dev_ns,
        })
    }
}
