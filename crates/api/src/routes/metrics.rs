//! Prometheus exposition of the ledger's counters and timings.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    ([(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], handle.render())
}

/// Registers descriptions for the metrics the ledger emits.
pub fn describe_metrics() {
    metrics::describe_counter!("orders_committed_total", "Orders committed");
    metrics::describe_counter!("orders_deleted_total", "Orders deleted with stock restored");
    metrics::describe_counter!(
        "order_commit_failures_total",
        "Order commits rejected or failed"
    );
    metrics::describe_counter!(
        "stock_units_committed_total",
        "Product units taken out of stock by commits"
    );
    metrics::describe_histogram!(
        "orders_commit_duration_seconds",
        metrics::Unit::Seconds,
        "Time to commit an order"
    );
}
