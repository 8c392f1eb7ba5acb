//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::PrometheusHandle;

// Prometheus text exposition format, version 0.0.4.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics — renders the recorder's current state as Prometheus
/// exposition text (fulfillment counters included).
pub async fn get(State(handle): State<PrometheusHandle>) -> Response {
    ([(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], handle.render()).into_response()
}
