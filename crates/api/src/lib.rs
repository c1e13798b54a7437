//! HTTP admin surface for the saga orchestrator.
//!
//! Exposes order submission, status polling, and failure injection over
//! REST, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use journal::CheckpointLog;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    InMemoryInventoryProvider, InMemoryNotificationProvider, InMemoryPaymentProvider,
    InMemoryShippingProvider, RetryPolicyTable, SagaOrchestrator, StepGateway,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L: CheckpointLog + 'static>(
    state: Arc<AppState<L>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::submit::<L>))
        .route("/orders/{id}", get(routes::orders::status::<L>))
        .route(
            "/orders/{id}/inject-failure",
            post(routes::orders::inject_failure::<L>),
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

/// Creates the default application state over the given checkpoint log,
/// wiring the in-memory providers and the given retry policies.
pub fn create_default_state<L: CheckpointLog>(
    log: L,
    policies: RetryPolicyTable,
) -> Arc<AppState<L>> {
    let gateway = StepGateway::new(
        InMemoryPaymentProvider::new(),
        InMemoryInventoryProvider::new(),
        InMemoryShippingProvider::new(),
        InMemoryNotificationProvider::new(),
    );
    let orchestrator = Arc::new(SagaOrchestrator::new(log, gateway, policies));
    Arc::new(AppState { orchestrator })
}
