// =============================================================================
// METRICS MODULE
// =============================================================================
// Prometheus metrics for the selector service.
//
// METRIC TYPES USED:
// - Counter: Only goes up (requests, selection outcomes)
// - Gauge: Can go up or down (pharmacies surviving each stage, last run)
// - Histogram: Distribution of values in buckets (latencies)
// =============================================================================

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// METRIC NAMES
// =============================================================================

/// HTTP request counter
/// Labels: method, endpoint, status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// HTTP request duration histogram
/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Outbound call latency
/// Labels: service (catalog_search/delivery_pricing)
pub const UPSTREAM_REQUEST_DURATION_SECONDS: &str = "upstream_request_duration_seconds";

/// Pharmacies left after each pipeline stage in the latest run
/// Labels: stage (search/fulfilled/nearest/options)
pub const PIPELINE_CANDIDATES: &str = "pipeline_candidates";

/// How each /best_analog call ended
/// Labels: outcome (selected/error code)
pub const SELECTION_OUTCOMES_TOTAL: &str = "selection_outcomes_total";

/// Initialize the Prometheus recorder and return the render handle.
pub fn setup_metrics() -> Result<PrometheusHandle> {
    // 5ms .. 10s: a request fans out to two upstream services
    let latency_buckets = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(UPSTREAM_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request latency in seconds");
    describe_histogram!(
        UPSTREAM_REQUEST_DURATION_SECONDS,
        "Catalog search and delivery pricing call latency in seconds"
    );
    describe_gauge!(
        PIPELINE_CANDIDATES,
        "Pharmacies remaining after each pipeline stage in the latest run"
    );
    describe_counter!(
        SELECTION_OUTCOMES_TOTAL,
        "Best-option requests by outcome"
    );

    Ok(handle)
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Record an HTTP request
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

/// Record one call to an upstream collaborator
pub fn record_upstream_request(service: &'static str, duration_secs: f64) {
    histogram!(UPSTREAM_REQUEST_DURATION_SECONDS, "service" => service).record(duration_secs);
}

pub fn set_stage_candidates(stage: &'static str, count: usize) {
    gauge!(PIPELINE_CANDIDATES, "stage" => stage).set(count as f64);
}

/// Record how a selection request ended (`selected` or an error code)
pub fn record_selection_outcome(outcome: &'static str) {
    counter!(SELECTION_OUTCOMES_TOTAL, "outcome" => outcome).increment(1);
}
