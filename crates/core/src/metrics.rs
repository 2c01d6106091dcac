//! Metrics definitions for the projection service.
//!
//! This module defines all metrics used throughout the projector.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "events_decoded_total",
        "Total number of raw logs successfully decoded into typed events"
    );
    describe_counter!(
        "decode_errors_total",
        "Total number of raw logs that failed to decode against their signature"
    );
    describe_counter!(
        "events_projected_total",
        "Total number of events successfully applied by a projection handler"
    );
    describe_counter!(
        "handler_errors_total",
        "Total number of projection handler failures"
    );
    describe_counter!(
        "duplicate_events_total",
        "Total number of redelivered events skipped by the idempotency check"
    );
    describe_counter!(
        "unknown_market_skips_total",
        "Total number of events skipped because their market is not tracked locally"
    );
    describe_histogram!(
        "projection_duration_seconds",
        "Time taken to decode and project one delivery in seconds"
    );
}

/// Record a successfully decoded event.
pub fn record_event_decoded(event_name: &str) {
    counter!("events_decoded_total", "event" => event_name.to_string()).increment(1);
}

/// Record a decode failure for an event signature.
pub fn record_decode_error(event_name: &str) {
    counter!("decode_errors_total", "event" => event_name.to_string()).increment(1);
}

/// Record an event successfully applied by a handler.
pub fn record_event_projected(projection: &str, event_name: &str) {
    counter!(
        "events_projected_total",
        "projection" => projection.to_string(),
        "event" => event_name.to_string()
    )
    .increment(1);
}

/// Record a projection handler failure.
pub fn record_handler_error(projection: &str, event_name: &str) {
    counter!(
        "handler_errors_total",
        "projection" => projection.to_string(),
        "event" => event_name.to_string()
    )
    .increment(1);
}

/// Record a redelivered event skipped by the idempotency check.
pub fn record_duplicate_event(event_name: &str) {
    counter!("duplicate_events_total", "event" => event_name.to_string()).increment(1);
}

/// Record an event skipped because its market is untracked.
pub fn record_unknown_market_skip(event_name: &str) {
    counter!("unknown_market_skips_total", "event" => event_name.to_string()).increment(1);
}

/// Record projection duration for one delivery.
pub fn record_projection_duration(duration_secs: f64) {
    histogram!("projection_duration_seconds").record(duration_secs);
}

/// A timer that automatically records duration when dropped.
pub struct ProjectionTimer {
    start: Instant,
}

impl ProjectionTimer {
    /// Start a new projection timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for ProjectionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProjectionTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_projection_duration(duration);
    }
}
