//! HTTP API for the cafe order system.
//!
//! Exposes menu, inventory, order and report endpoints over any storage
//! backend, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, CafeStore};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CafeStore>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>).delete(routes::orders::delete::<S>),
        )
        .route("/orders/{id}/close", post(routes::orders::close::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route(
            "/menu",
            post(routes::menu::create::<S>).get(routes::menu::list::<S>),
        )
        .route(
            "/menu/{id}",
            get(routes::menu::get::<S>)
                .put(routes::menu::update::<S>)
                .delete(routes::menu::delete::<S>),
        )
        .route(
            "/inventory",
            post(routes::inventory::create::<S>).get(routes::inventory::list::<S>),
        )
        .route(
            "/inventory/leftovers",
            get(routes::inventory::leftovers::<S>),
        )
        .route(
            "/inventory/{id}",
            get(routes::inventory::get::<S>)
                .put(routes::inventory::update::<S>)
                .delete(routes::inventory::delete::<S>),
        )
        .route(
            "/reports/total-sales",
            get(routes::reports::total_sales::<S>),
        )
        .route(
            "/reports/popular-items",
            get(routes::reports::popular_items::<S>),
        )
        .route(
            "/reports/ordered-items",
            get(routes::reports::ordered_items::<S>),
        )
        .route(
            "/reports/ordered-items-by-period",
            get(routes::reports::ordered_items_by_period::<S>),
        )
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
