//! Line-item endpoints. All mutations go through the fulfillment
//! coordinator so stock, subtotal, and order total move together.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, OrderItemId, ProductId};
use serde::Deserialize;
use store::OrderStore;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::AppState;
use crate::routes::orders::OrderItemResponse;

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// POST /orders/:id/items — add a line item to an order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<OrderItemResponse>), ApiError> {
    let item = state
        .coordinator
        .create_item(
            OrderId::from_uuid(order_id),
            ProductId::from_uuid(req.product_id),
            req.quantity,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// PUT /items/:id — change a line item's product and/or quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<OrderItemResponse>, ApiError> {
    let item = state
        .coordinator
        .edit_item(
            OrderItemId::from_uuid(item_id),
            ProductId::from_uuid(req.product_id),
            req.quantity,
        )
        .await?;
    Ok(Json(item.into()))
}

/// DELETE /items/:id — remove a line item. Deleting an id that no longer
/// exists still returns 204.
#[tracing::instrument(skip(state))]
pub async fn delete<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .coordinator
        .delete_item(OrderItemId::from_uuid(item_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
