//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Announcer (items processed, outcomes)
//! - Matcher (selected candidate scores)
//! - Media pipeline (assets fetched, thread replies)
//! - External services (IGDB, Matrix, media hosts, feed)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Announcer Metrics
// =============================================================================

/// Feed items processed total by outcome.
pub static ITEMS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gamecaster_items_processed_total", "Total feed items processed"),
        &["outcome"], // "skipped", "threaded", "text_fallback", "plain_notice", "failed"
    )
    .unwrap()
});

/// Feed polls total by result.
pub static FEED_POLLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gamecaster_feed_polls_total", "Total feed polls"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Matcher Metrics
// =============================================================================

/// Score of the selected candidate.
pub static MATCH_SCORE: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "gamecaster_match_score",
            "Distribution of selected candidate scores",
        )
        .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 1.0]),
    )
    .unwrap()
});

/// Candidates returned per catalog search.
pub static CANDIDATES_FOUND: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "gamecaster_candidates_found",
            "Number of catalog candidates per search",
        )
        .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0]),
    )
    .unwrap()
});

// =============================================================================
// Media Pipeline Metrics
// =============================================================================

/// Assets processed total by kind and result.
pub static ASSETS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gamecaster_assets_processed_total", "Total media assets processed"),
        &["kind", "result"], // kind: "cover", "screenshot"; result: "posted", "failed", "timed_out"
    )
    .unwrap()
});

/// Thread replies posted total.
pub static THREAD_REPLIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "gamecaster_thread_replies_total",
        "Total screenshot replies posted into threads",
    )
    .unwrap()
});

/// Transient failures that were retried.
pub static RETRY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gamecaster_retry_attempts_total", "Total retry attempts"),
        &["operation"], // "media_fetch", "matrix_upload"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "gamecaster_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "gamecaster_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record the outcome of one external request.
pub fn record_request(service: &str, operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, status])
        .inc();
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Announcer
        Box::new(ITEMS_PROCESSED.clone()),
        Box::new(FEED_POLLS.clone()),
        // Matcher
        Box::new(MATCH_SCORE.clone()),
        Box::new(CANDIDATES_FOUND.clone()),
        // Media
        Box::new(ASSETS_PROCESSED.clone()),
        Box::new(THREAD_REPLIES.clone()),
        Box::new(RETRY_ATTEMPTS.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        ITEMS_PROCESSED.with_label_values(&["skipped"]).inc();
        assert!(!registry.gather().is_empty());
    }
}
