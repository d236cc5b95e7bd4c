//! Metrics module
//!
//! Prometheus counters and histograms for uploads, probes and case outcomes.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};
use thiserror::Error;

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "teda_uploads_total",
        "Total number of uploads",
        &["bucket", "status"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "teda_upload_bytes_total",
        "Total bytes uploaded"
    ).unwrap();

    pub static ref UPLOAD_DURATION: HistogramVec = register_histogram_vec!(
        "teda_upload_duration_seconds",
        "Upload and listing duration in seconds",
        &["bucket"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]
    ).unwrap();

    // Probe metrics
    pub static ref PROBES_TOTAL: CounterVec = register_counter_vec!(
        "teda_probes_total",
        "HTTP probes by outcome",
        &["outcome"]  // "ok" or a failure kind
    ).unwrap();

    pub static ref PROBE_DURATION: HistogramVec = register_histogram_vec!(
        "teda_probe_duration_seconds",
        "HTTP probe duration in seconds",
        &["outcome"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    ).unwrap();

    // Case metrics
    pub static ref CASES_TOTAL: CounterVec = register_counter_vec!(
        "teda_cases_total",
        "Verification cases by outcome",
        &["outcome"]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "teda_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Metrics export errors
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("Encoded metrics are not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Record a successful upload
pub fn record_upload_success(bucket: &str, bytes: u64) {
    UPLOADS_TOTAL.with_label_values(&[bucket, "success"]).inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record a failed upload
pub fn record_upload_failure(bucket: &str) {
    UPLOADS_TOTAL.with_label_values(&[bucket, "failure"]).inc();
}

/// Record upload duration
pub fn record_upload_duration(bucket: &str, duration_secs: f64) {
    UPLOAD_DURATION
        .with_label_values(&[bucket])
        .observe(duration_secs);
}

/// Record a probe and how long it took
pub fn record_probe(outcome: &str, duration_secs: f64) {
    PROBES_TOTAL.with_label_values(&[outcome]).inc();
    PROBE_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

/// Record a case outcome ("passed", "failed", "skipped")
pub fn record_case(outcome: &str) {
    CASES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Render the default registry in the Prometheus text format
pub fn render() -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
