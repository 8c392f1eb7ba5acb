//! Order header endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use common::{CustomerId, OrderId, OrderState};
use serde::{Deserialize, Serialize};
use store::{OrderItemRecord, OrderRecord, OrderStore};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub customer_id: Option<Uuid>,
    pub state: Option<String>,
    /// The row version the caller last read; a stale value is rejected with
    /// 409 so the caller reloads instead of overwriting.
    pub row_version: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub placed_at: String,
    pub state: String,
    pub total_cents: i64,
    pub row_version: i64,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub subtotal_cents: i64,
}

impl From<OrderItemRecord> for OrderItemResponse {
    fn from(item: OrderItemRecord) -> Self {
        Self {
            id: item.id.to_string(),
            order_id: item.order_id.to_string(),
            product_id: item.product_id.to_string(),
            quantity: item.quantity,
            subtotal_cents: item.subtotal.cents(),
        }
    }
}

fn order_response(order: OrderRecord, items: Vec<OrderItemRecord>) -> OrderResponse {
    OrderResponse {
        id: order.id.to_string(),
        customer_id: order.customer_id.to_string(),
        placed_at: order.placed_at.to_rfc3339(),
        state: order.state.to_string(),
        total_cents: order.total.cents(),
        row_version: order.row_version,
        items: items.into_iter().map(Into::into).collect(),
    }
}

// -- Handlers --

/// POST /orders — create a pending order with an empty item set.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let customer_id = req
        .customer_id
        .map(CustomerId::from_uuid)
        .unwrap_or_default();
    let order = OrderRecord::new(customer_id, Utc::now());
    state.store.insert_order(&order).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(order_response(order, Vec::new())),
    ))
}

/// GET /orders/:id — load an order with its items.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    let items = state.store.list_items(order_id).await?;
    Ok(Json(order_response(order, items)))
}

/// PUT /orders/:id — edit the caller-editable order fields.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let mut order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    if let Some(customer_id) = req.customer_id {
        order.customer_id = CustomerId::from_uuid(customer_id);
    }
    if let Some(state_str) = &req.state {
        order.state = state_str
            .parse::<OrderState>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    }
    order.row_version = req.row_version;

    let updated = state.store.update_order(&order).await?;
    let items = state.store.list_items(order_id).await?;
    Ok(Json(order_response(updated, items)))
}

/// GET /orders/:id/items — list an order's line items.
#[tracing::instrument(skip(state))]
pub async fn items<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<OrderItemResponse>>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    let items = state.store.list_items(order_id).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}
