//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use journal::InMemoryCheckpointLog;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    InMemoryInventoryProvider, InMemoryNotificationProvider, InMemoryPaymentProvider,
    InMemoryShippingProvider, RetryPolicy, RetryPolicyTable, SagaOrchestrator, Step, StepGateway,
};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> Router {
    let log = InMemoryCheckpointLog::new();
    let state = api::create_default_state(log, RetryPolicyTable::immediate());
    api::create_app(state, get_metrics_handle())
}

/// Builds an app whose payment provider fails transiently forever while
/// the payment policy retries on a visible delay, leaving a window for
/// failure injection mid-flight.
fn setup_stuck_on_payment() -> (Router, InMemoryPaymentProvider) {
    let payment = InMemoryPaymentProvider::new();
    payment.set_transient_failures(u32::MAX);
    let gateway = StepGateway::new(
        payment.clone(),
        InMemoryInventoryProvider::new(),
        InMemoryShippingProvider::new(),
        InMemoryNotificationProvider::new(),
    );
    let policies = RetryPolicyTable::immediate().with_policy(
        Step::Payment,
        RetryPolicy::fixed(u32::MAX, Duration::from_millis(100)),
    );
    let orchestrator = Arc::new(SagaOrchestrator::new(
        InMemoryCheckpointLog::new(),
        gateway,
        policies,
    ));
    let state = Arc::new(api::routes::orders::AppState { orchestrator });
    (api::create_app(state, get_metrics_handle()), payment)
}

fn order_body() -> String {
    serde_json::json!({
        "customer_id": "CUST-42",
        "items": [
            { "product_id": "SKU-001", "quantity": 2, "unit_price_cents": 1000 },
            { "product_id": "SKU-002", "quantity": 1, "unit_price_cents": 2500 }
        ],
        "total_cents": 4500,
        "shipping_address": "1 Main St, Springfield"
    })
    .to_string()
}

async fn post_json(app: &Router, uri: &str, body: String) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Polls order status until it reaches a terminal state.
async fn wait_for_terminal(app: &Router, order_id: &str) -> serde_json::Value {
    for _ in 0..100 {
        let (status, json) = get_json(app, &format!("/orders/{order_id}")).await;
        assert_eq!(status, StatusCode::OK);
        let state = json["status"].as_str().unwrap_or_default().to_string();
        if state == "COMPLETED" || state == "FAILED" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("saga for order {order_id} never reached a terminal state");
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_submit_order_runs_to_completion() {
    let app = setup();

    let (status, json) = post_json(&app, "/orders", order_body()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "PENDING");
    let order_id = json["order_id"].as_str().unwrap().to_string();

    let terminal = wait_for_terminal(&app, &order_id).await;
    assert_eq!(terminal["status"], "COMPLETED");
    assert_eq!(
        terminal["completed_steps"],
        serde_json::json!(["PAYMENT", "INVENTORY", "SHIPPING", "NOTIFICATION"])
    );
    assert!(terminal["failure_reason"].is_null());
}

#[tokio::test]
async fn test_submit_invalid_order_is_rejected() {
    let app = setup();
    let body = serde_json::json!({
        "customer_id": "CUST-42",
        "items": [],
        "total_cents": 0,
        "shipping_address": "1 Main St"
    })
    .to_string();

    let (status, json) = post_json(&app, "/orders", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("invalid order"));
}

#[tokio::test]
async fn test_status_unknown_order() {
    let app = setup();
    let (status, _) = get_json(&app, &format!("/orders/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_malformed_order_id() {
    let app = setup();
    let (status, json) = get_json(&app, "/orders/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid order id"));
}

#[tokio::test]
async fn test_inject_failure_unknown_step() {
    let app = setup();

    let (_, submitted) = post_json(&app, "/orders", order_body()).await;
    let order_id = submitted["order_id"].as_str().unwrap().to_string();

    let (status, json) = post_json(
        &app,
        &format!("/orders/{order_id}/inject-failure"),
        serde_json::json!({ "step": "TELEPORT" }).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("unknown saga step"));
}

#[tokio::test]
async fn test_inject_failure_unknown_order() {
    let app = setup();
    let (status, _) = post_json(
        &app,
        &format!("/orders/{}/inject-failure", uuid::Uuid::new_v4()),
        serde_json::json!({ "step": "PAYMENT" }).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inject_failure_mid_flight() {
    let (app, _payment) = setup_stuck_on_payment();

    let (status, submitted) = post_json(&app, "/orders", order_body()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let order_id = submitted["order_id"].as_str().unwrap().to_string();

    // The saga is cycling on payment retries; stage the injection and let
    // the next evaluation consume it
    let (status, injected) = post_json(
        &app,
        &format!("/orders/{order_id}/inject-failure"),
        serde_json::json!({ "step": "PAYMENT" }).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(injected["step"], "PAYMENT");

    let terminal = wait_for_terminal(&app, &order_id).await;
    assert_eq!(terminal["status"], "FAILED");
    assert_eq!(terminal["failure_reason"]["kind"], "SIMULATED");
    assert_eq!(
        terminal["failure_reason"]["message"],
        "simulated failure: PAYMENT"
    );
}
