use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Metric name prefix for all analytics metrics
const PREFIX: &str = "pezzottify_analytics";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Aggregation Metrics
    pub static ref AGGREGATION_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_aggregation_runs_total"), "Aggregator runs by granularity and status"),
        &["granularity", "status"]
    ).expect("Failed to create aggregation_runs_total metric");

    pub static ref AGGREGATION_ROWS_WRITTEN_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_aggregation_rows_written_total"), "Stats rows upserted by aggregators"),
        &["granularity"]
    ).expect("Failed to create aggregation_rows_written_total metric");

    pub static ref AGGREGATION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_aggregation_duration_seconds"),
            "Aggregator run duration in seconds"
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
        &["granularity"]
    ).expect("Failed to create aggregation_duration_seconds metric");

    // Strength Score Metrics
    pub static ref STRENGTH_SCORES_COMPUTED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_strength_scores_computed_total"), "Artist strength scores computed"),
        &["time_range"]
    ).expect("Failed to create strength_scores_computed_total metric");

    pub static ref STRENGTH_SCORES_FAILED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_strength_scores_failed_total"), "Artist strength score computations that failed"),
        &["time_range"]
    ).expect("Failed to create strength_scores_failed_total metric");

    pub static ref STRENGTH_BATCH_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_strength_batch_duration_seconds"),
            "Strength batch duration in seconds"
        )
        .buckets(vec![0.1, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
        &["time_range"]
    ).expect("Failed to create strength_batch_duration_seconds metric");

    // Background Job Metrics
    pub static ref BACKGROUND_JOB_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_background_job_executions_total"), "Background job executions by job and status"),
        &["job_id", "status"]
    ).expect("Failed to create background_job_executions_total metric");

    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_background_job_duration_seconds"),
            "Background job duration in seconds"
        )
        .buckets(vec![0.1, 1.0, 10.0, 60.0, 300.0, 900.0, 3600.0]),
        &["job_id"]
    ).expect("Failed to create background_job_duration_seconds metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(AGGREGATION_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AGGREGATION_ROWS_WRITTEN_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AGGREGATION_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(STRENGTH_SCORES_COMPUTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STRENGTH_SCORES_FAILED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STRENGTH_BATCH_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_DURATION_SECONDS.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a successful aggregator run
pub fn record_aggregation_success(granularity: &str, rows_written: usize, duration: Duration) {
    AGGREGATION_RUNS_TOTAL
        .with_label_values(&[granularity, "success"])
        .inc();
    AGGREGATION_ROWS_WRITTEN_TOTAL
        .with_label_values(&[granularity])
        .inc_by(rows_written as f64);
    AGGREGATION_DURATION_SECONDS
        .with_label_values(&[granularity])
        .observe(duration.as_secs_f64());
}

pub fn record_aggregation_failure(granularity: &str) {
    AGGREGATION_RUNS_TOTAL
        .with_label_values(&[granularity, "failed"])
        .inc();
}

pub fn record_strength_score_computed(time_range: &str) {
    STRENGTH_SCORES_COMPUTED_TOTAL
        .with_label_values(&[time_range])
        .inc();
}

pub fn record_strength_score_failed(time_range: &str) {
    STRENGTH_SCORES_FAILED_TOTAL
        .with_label_values(&[time_range])
        .inc();
}

pub fn record_strength_batch(time_range: &str, duration: Duration) {
    STRENGTH_BATCH_DURATION_SECONDS
        .with_label_values(&[time_range])
        .observe(duration.as_secs_f64());
}

/// Record a background job execution
pub fn record_background_job_execution(job_id: &str, status: &str, duration: Duration) {
    BACKGROUND_JOB_EXECUTIONS_TOTAL
        .with_label_values(&[job_id, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_id])
        .observe(duration.as_secs_f64());
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
