//! Lock-free counters for stream and pipeline health
//!
//! All counters are monotonic and updated with relaxed atomics; they are
//! statistical only and never used for coordination. Dropped confirmations
//! in particular are an expected part of the stream contract (duplicates,
//! traffic for other callers) and are surfaced here instead of being
//! treated as errors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

pub struct Metrics {
    /// Confirmations delivered to a registered connect call.
    confirmations_routed: AtomicU64,
    /// Confirmations with no registered VIN (duplicate or foreign traffic).
    confirmations_dropped: AtomicU64,
    /// Telemetry messages parsed off the vendor stream.
    telemetry_received: AtomicU64,
    /// Telemetry messages dropped because the pipeline channel was full.
    telemetry_dropped: AtomicU64,
    /// Canonical events successfully normalized.
    events_normalized: AtomicU64,
    /// Telemetry messages that failed lookup or normalization.
    events_failed: AtomicU64,
    /// Canonical events accepted by the downstream node.
    events_published: AtomicU64,
    /// Publish attempts rejected or failed.
    publish_failures: AtomicU64,
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            confirmations_routed: AtomicU64::new(0),
            confirmations_dropped: AtomicU64::new(0),
            telemetry_received: AtomicU64::new(0),
            telemetry_dropped: AtomicU64::new(0),
            events_normalized: AtomicU64::new(0),
            events_failed: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    #[inline]
    pub fn record_confirmation_routed(&self) {
        self.confirmations_routed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_confirmation_dropped(&self) {
        self.confirmations_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_telemetry_received(&self) {
        self.telemetry_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_telemetry_dropped(&self) {
        self.telemetry_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_event_normalized(&self) {
        self.events_normalized.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_event_failed(&self) {
        self.events_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_event_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters without resetting.
    pub fn snapshot(&self) -> MetricsSummary {
        MetricsSummary {
            confirmations_routed: self.confirmations_routed.load(Ordering::Relaxed),
            confirmations_dropped: self.confirmations_dropped.load(Ordering::Relaxed),
            telemetry_received: self.telemetry_received.load(Ordering::Relaxed),
            telemetry_dropped: self.telemetry_dropped.load(Ordering::Relaxed),
            events_normalized: self.events_normalized.load(Ordering::Relaxed),
            events_failed: self.events_failed.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSummary {
    pub confirmations_routed: u64,
    pub confirmations_dropped: u64,
    pub telemetry_received: u64,
    pub telemetry_dropped: u64,
    pub events_normalized: u64,
    pub events_failed: u64,
    pub events_published: u64,
    pub publish_failures: u64,
    pub uptime_secs: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            confirmations_routed = %self.confirmations_routed,
            confirmations_dropped = %self.confirmations_dropped,
            telemetry_received = %self.telemetry_received,
            telemetry_dropped = %self.telemetry_dropped,
            events_normalized = %self.events_normalized,
            events_failed = %self.events_failed,
            events_published = %self.events_published,
            publish_failures = %self.publish_failures,
            uptime_secs = %self.uptime_secs,
            "metrics_summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_confirmation_routed();
        metrics.record_confirmation_dropped();
        metrics.record_confirmation_dropped();
        metrics.record_event_normalized();
        metrics.record_publish_failure();

        let summary = metrics.snapshot();
        assert_eq!(summary.confirmations_routed, 1);
        assert_eq!(summary.confirmations_dropped, 2);
        assert_eq!(summary.events_normalized, 1);
        assert_eq!(summary.publish_failures, 1);
        assert_eq!(summary.telemetry_received, 0);
    }
}
