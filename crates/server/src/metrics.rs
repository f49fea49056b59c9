//! Prometheus metrics exposition (spec §6 `GET /metrics`, ambient
//! observability stack carried per the system instructions): request
//! counters and stage latency histograms, installed the way the teacher
//! wires `metrics-exporter-prometheus`.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new().install_recorder().expect("failed to install Prometheus recorder")
}

pub fn record_request(path: &str, status: u16) {
    metrics::counter!("ragcore_http_requests_total", "path" => path.to_string(), "status" => status.to_string()).increment(1);
}

pub fn record_pipeline_latency(stage: &str, duration_ms: f64) {
    metrics::histogram!("ragcore_pipeline_stage_duration_ms", "stage" => stage.to_string()).record(duration_ms);
}

pub fn record_error(kind: &str) {
    metrics::counter!("ragcore_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Records a request counter and latency histogram for every HTTP request
/// that reaches the router, keyed by matched path and status code.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    let status = response.status().as_u16();

    record_request(&path, status);
    metrics::histogram!("ragcore_http_request_duration_ms", "path" => path).record(started.elapsed().as_secs_f64() * 1000.0);
    if status >= 500 {
        record_error("http_5xx");
    }

    response
}

pub async fn metrics_handler(axum::extract::State(state): axum::extract::State<crate::state::AppState>) -> String {
    state.metrics_handle.render()
}
