//! Order creation, lookup and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{Order, OrderId, OrderLine, ProductId};
use domain::{OrderLineRequest, OrderRequest};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::parse_id;
use crate::state::{AppState, CafeStore};

/// Header carrying the client-chosen key that makes order creation retryable.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_name: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<&OrderLine> for OrderItemResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id.to_string(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            line_total_cents: line.line_total().cents(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            customer_name: order.customer_name,
            status: order.status.to_string(),
            items: order.lines.iter().map(OrderItemResponse::from).collect(),
            total_cents: order.total.cents(),
            created_at: order.created_at,
            idempotency_key: order.idempotency_key,
        }
    }
}

// -- Handlers --

/// POST /orders: create an order and deduct its ingredients.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn create<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload?;

    let lines = req
        .items
        .iter()
        .map(|item| {
            Ok(OrderLineRequest::new(
                parse_id::<ProductId>(&item.product_id)?,
                item.quantity,
            ))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let mut request = OrderRequest::new(req.customer_name, lines);
    if let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) {
        let key = value.to_str().map_err(|_| {
            ApiError::BadRequest("Idempotency-Key must be visible ASCII".to_string())
        })?;
        request = request.with_idempotency_key(key);
    }

    let order = state.engine.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders: list all orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list().await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}: load one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let order = state.orders.get(order_id).await?;
    Ok(Json(order.into()))
}

/// DELETE /orders/{id}: hard delete; consumed stock is not returned.
#[tracing::instrument(skip(state))]
pub async fn delete<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    state.orders.delete(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /orders/{id}/close: mark an open order as served.
#[tracing::instrument(skip(state))]
pub async fn close<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let order = state.engine.close_order(order_id).await?;
    Ok(Json(order.into()))
}

/// POST /orders/{id}/cancel: abandon an open order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let order = state.engine.cancel_order(order_id).await?;
    Ok(Json(order.into()))
}
