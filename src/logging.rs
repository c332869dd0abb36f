//! Lightweight operation-timing metrics: a running tally of count,
//! duration, and error rate per kind of manager operation.

use log::{error, info};
use std::time::Duration;

/// Running statistics for one kind of manager operation (add/search/sync/...).
#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    pub operation_count: u64,
    pub total_duration: Duration,
    pub avg_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub errors: u64,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            operation_count: 0,
            total_duration: Duration::ZERO,
            avg_duration: Duration::ZERO,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
            errors: 0,
        }
    }

    pub fn record_operation(&mut self, duration: Duration, success: bool) {
        self.operation_count += 1;
        self.total_duration += duration;

        if duration < self.min_duration {
            self.min_duration = duration;
        }
        if duration > self.max_duration {
            self.max_duration = duration;
        }

        if !success {
            self.errors += 1;
        }

        self.avg_duration = self.total_duration / self.operation_count as u32;
    }

    pub fn success_rate(&self) -> f64 {
        if self.operation_count == 0 {
            1.0
        } else {
            (self.operation_count - self.errors) as f64 / self.operation_count as f64
        }
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Times a fallible block and logs its outcome at `info`/`error`, returning
/// `(result, duration)` so the caller can also feed a [`PerformanceMetrics`].
#[macro_export]
macro_rules! timed_operation {
    ($operation_type:expr, $block:block) => {{
        let start = std::time::Instant::now();
        let result = $block;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                log::info!("{} completed in {:?}", $operation_type, duration);
            }
            Err(e) => {
                log::error!("{} failed in {:?}: {}", $operation_type, duration, e);
            }
        }

        (result, duration)
    }};
}

pub fn log_performance_metrics(metrics: &PerformanceMetrics, operation_type: &str) {
    info!(
        "{operation_type}: count={}, avg={:?}, min={:?}, max={:?}, success_rate={:.2}%",
        metrics.operation_count,
        metrics.avg_duration,
        metrics.min_duration,
        metrics.max_duration,
        metrics.success_rate() * 100.0
    );
}

pub fn log_storage_error(operation: &str, path: &str, err: &dyn std::error::Error) {
    error!("storage {operation} failed for {path}: {err}");
}
