//! Order submission, status, and failure-injection endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, OrderId, OrderItem, OrderRequest};
use journal::CheckpointLog;
use saga::{
    FailureReason, InMemoryInventoryProvider, InMemoryNotificationProvider,
    InMemoryPaymentProvider, InMemoryShippingProvider, SagaOrchestrator,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// The orchestrator wired with the in-memory providers this server ships.
pub type Orchestrator<L> = SagaOrchestrator<
    L,
    InMemoryPaymentProvider,
    InMemoryInventoryProvider,
    InMemoryShippingProvider,
    InMemoryNotificationProvider,
>;

/// Shared application state accessible from all handlers.
pub struct AppState<L: CheckpointLog> {
    pub orchestrator: Arc<Orchestrator<L>>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct SubmitOrderRequest {
    pub customer_id: String,
    pub items: Vec<OrderItemRequest>,
    pub total_cents: i64,
    pub shipping_address: String,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct InjectFailureRequest {
    pub step: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderAcceptedResponse {
    pub order_id: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct OrderStatusResponse {
    pub order_id: String,
    pub status: String,
    pub completed_steps: Vec<String>,
    pub failure_reason: Option<FailureReasonResponse>,
}

#[derive(Serialize)]
pub struct FailureReasonResponse {
    pub kind: String,
    pub message: String,
}

impl From<FailureReason> for FailureReasonResponse {
    fn from(reason: FailureReason) -> Self {
        Self {
            kind: reason.kind.to_string(),
            message: reason.message,
        }
    }
}

#[derive(Serialize)]
pub struct InjectFailureResponse {
    pub order_id: String,
    pub step: String,
}

// -- Handlers --

/// POST /orders — accept an order and start its saga in the background.
#[tracing::instrument(skip(state, req))]
pub async fn submit<L: CheckpointLog + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Json(req): Json<SubmitOrderRequest>,
) -> Result<(StatusCode, Json<OrderAcceptedResponse>), ApiError> {
    let items: Vec<OrderItem> = req
        .items
        .iter()
        .map(|item| {
            OrderItem::new(
                item.product_id.as_str(),
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            )
        })
        .collect();
    let request = OrderRequest::new(
        req.customer_id.as_str(),
        items,
        Money::from_cents(req.total_cents),
        req.shipping_address.as_str(),
    );

    let order_id = state.orchestrator.submit(request)?;

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if let Err(error) = orchestrator.run(order_id).await {
            tracing::error!(%order_id, %error, "saga execution aborted");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(OrderAcceptedResponse {
            order_id: order_id.to_string(),
            status: "PENDING".to_string(),
        }),
    ))
}

/// GET /orders/:id — current saga progress for an order.
#[tracing::instrument(skip(state))]
pub async fn status<L: CheckpointLog + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderStatusResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let snapshot = state.orchestrator.registry().status(order_id)?;

    Ok(Json(OrderStatusResponse {
        order_id: snapshot.order_id.to_string(),
        status: snapshot.status.to_string(),
        completed_steps: snapshot
            .completed_steps
            .iter()
            .map(|s| s.to_string())
            .collect(),
        failure_reason: snapshot.failure_reason.map(Into::into),
    }))
}

/// POST /orders/:id/inject-failure — stage a simulated failure for a step.
#[tracing::instrument(skip(state, req))]
pub async fn inject_failure<L: CheckpointLog + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
    Json(req): Json<InjectFailureRequest>,
) -> Result<(StatusCode, Json<InjectFailureResponse>), ApiError> {
    let order_id = parse_order_id(&id)?;
    let step = state
        .orchestrator
        .registry()
        .inject_failure(order_id, &req.step)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(InjectFailureResponse {
            order_id: order_id.to_string(),
            step: step.to_string(),
        }),
    ))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
