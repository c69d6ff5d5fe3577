//! Order ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{CustomerId, Order, OrderId, OrderStatus, OrderSummary, ProductId};
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: CustomerId,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

// -- Handlers --

/// POST /orders: assemble a cart from the items and commit it.
///
/// Items go through the same checks as an interactive cart, so a repeated
/// product is merged into one line.
#[tracing::instrument(skip(state, req), fields(customer_id = %req.customer_id))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let mut cart = state.ledger.begin_order(req.customer_id).await?;
    for item in &req.items {
        state
            .ledger
            .add_to_cart(&mut cart, item.product_id, item.quantity)
            .await?;
    }

    let order = state.ledger.commit(cart).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: every order with its customer, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(state.ledger.list_all().await?))
}

/// GET /orders/:id: an order with its customer and line items.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.ledger.get_by_id(id).await?))
}

/// PUT /orders/:id/status: overwrite the status.
#[tracing::instrument(skip(state))]
pub async fn set_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<OrderSummary>, ApiError> {
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: common::ParseStatusError| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(state.ledger.set_status(id, status).await?))
}

/// DELETE /orders/:id: delete the order and restore its stock.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode, ApiError> {
    state.ledger.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
