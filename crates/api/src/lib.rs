//! HTTP API server for the order fulfillment system.
//!
//! Provides REST endpoints for catalog products, orders, and line items,
//! with structured logging (tracing) and Prometheus metrics. Line-item
//! mutations run through the fulfillment coordinator so stock, subtotals,
//! and order totals never drift apart.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use fulfillment::FulfillmentCoordinator;
use metrics_exporter_prometheus::PrometheusHandle;
use store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}", put(routes::orders::update::<S>))
        .route("/orders/{id}/items", get(routes::orders::items::<S>))
        .route("/orders/{id}/items", post(routes::items::create::<S>))
        .route("/items/{id}", put(routes::items::update::<S>))
        .route("/items/{id}", delete(routes::items::delete::<S>))
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

/// Creates the shared application state over the given store.
pub fn create_state<S: OrderStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        store: store.clone(),
        coordinator: FulfillmentCoordinator::new(store),
    })
}
