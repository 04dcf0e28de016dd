// ============================================================================
// Prometheus Metrics
// ============================================================================
//
// - britonia_http_requests_total{method,path,status}
// - britonia_http_request_duration_seconds{method,path,status}
// - britonia_contact_submissions_total{outcome}
//     outcome: accepted | invalid | honeypot_filled | too_fast | dispatch_failed
// - britonia_mail_dispatch_duration_seconds{result}
//
// Scraped from GET /metrics.
//
// ============================================================================

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::time::{Duration, Instant};

lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "britonia_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    ).unwrap();

    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "britonia_http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "path", "status"],
        vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0]
    ).unwrap();

    /// Contact submissions by pipeline outcome
    pub static ref CONTACT_SUBMISSIONS_TOTAL: CounterVec = register_counter_vec!(
        "britonia_contact_submissions_total",
        "Contact form submissions by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref MAIL_DISPATCH_DURATION: HistogramVec = register_histogram_vec!(
        "britonia_mail_dispatch_duration_seconds",
        "Time spent handing an inquiry to the mail service",
        &["result"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();
}

/// Unknown paths share one label so scanners cannot blow up cardinality
fn path_label(path: &str) -> &'static str {
    match path {
        "/api/contact" => "/api/contact",
        "/api/send-email" => "/api/send-email",
        "/api/health" => "/api/health",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = path_label(request.uri().path());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    let labels = [method.as_str(), path, status.as_str()];
    HTTP_REQUESTS_TOTAL.with_label_values(&labels).inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&labels)
        .observe(start.elapsed().as_secs_f64());

    response
}

pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];

    match encoder.encode(&prometheus::gather(), &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                b"Failed to encode metrics".to_vec(),
            )
        }
    }
}

pub fn record_submission_outcome(outcome: &str) {
    CONTACT_SUBMISSIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn observe_dispatch(elapsed: Duration, sent: bool) {
    let result = if sent { "sent" } else { "failed" };
    MAIL_DISPATCH_DURATION
        .with_label_values(&[result])
        .observe(elapsed.as_secs_f64());
}
