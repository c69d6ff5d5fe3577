//! HTTP API server with observability for the shop order system.
//!
//! Provides REST endpoints for customers, products and orders, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

pub use routes::metrics::describe_metrics;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{CatalogService, CustomerDirectory, OrderLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store + Clone> {
    pub catalog: CatalogService<S>,
    pub directory: CustomerDirectory<S>,
    pub ledger: OrderLedger<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Builds every service over one shared store.
    pub fn new(store: S) -> Self {
        let ledger = OrderLedger::new(store);
        Self {
            catalog: ledger.catalog().clone(),
            directory: ledger.directory().clone(),
            ledger,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{customers, orders, products};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/customers",
            get(customers::list::<S>).post(customers::create::<S>),
        )
        .route(
            "/customers/{id}",
            get(customers::get::<S>)
                .put(customers::update::<S>)
                .delete(customers::delete::<S>),
        )
        .route("/customers/{id}/orders", get(customers::orders::<S>))
        .route(
            "/products",
            get(products::list::<S>).post(products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(products::get::<S>)
                .put(products::update::<S>)
                .delete(products::delete::<S>),
        )
        .route("/products/{id}/stock", post(products::adjust_stock::<S>))
        .route("/orders", get(orders::list::<S>).post(orders::create::<S>))
        .route(
            "/orders/{id}",
            get(orders::get::<S>).delete(orders::delete::<S>),
        )
        .route("/orders/{id}/status", put(orders::set_status::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
