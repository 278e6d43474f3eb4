//! Prometheus metrics for mimic-http.
//!
//! Tracks match outcomes, mapping exclusions and scenario transitions.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Total number of requests answered
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "mimic_requests_total",
        "Total number of requests answered by the server",
        &["method", "status"]
    )
    .unwrap();

    /// Outcome of mapping selection per request
    pub static ref MATCH_OUTCOMES_TOTAL: CounterVec = register_counter_vec!(
        "mimic_match_outcomes_total",
        "Mapping selection outcomes",
        &["outcome"]  // outcome: full|partial|none
    )
    .unwrap();

    /// Mappings dropped from consideration during selection
    pub static ref MAPPINGS_EXCLUDED_TOTAL: CounterVec = register_counter_vec!(
        "mimic_mappings_excluded_total",
        "Mappings excluded while selecting a match",
        &["reason"]  // reason: time_window|probability|evaluation_error|matcher_error
    )
    .unwrap();

    /// Scenario commits by result
    pub static ref SCENARIO_TRANSITIONS_TOTAL: CounterVec = register_counter_vec!(
        "mimic_scenario_transitions_total",
        "Scenario state commits",
        &["scenario", "result"]  // result: advanced|counted|finished|stale
    )
    .unwrap();

    /// Time spent selecting a mapping
    pub static ref MATCH_DURATION_MS: HistogramVec = register_histogram_vec!(
        "mimic_match_duration_ms",
        "Histogram of mapping selection time in milliseconds",
        &["outcome"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0]
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record an answered request
pub fn record_request(method: &str, status: u16) {
    REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
}

/// Helper to record a selection outcome and its duration
pub fn record_match(outcome: &str, duration_ms: f64) {
    MATCH_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
    MATCH_DURATION_MS
        .with_label_values(&[outcome])
        .observe(duration_ms);
}

/// Helper to record an excluded mapping
pub fn record_exclusion(reason: &str) {
    MAPPINGS_EXCLUDED_TOTAL.with_label_values(&[reason]).inc();
}

/// Helper to record a scenario commit
pub fn record_scenario_transition(scenario: &str, result: &str) {
    SCENARIO_TRANSITIONS_TOTAL
        .with_label_values(&[scenario, result])
        .inc();
}
