//! Customer directory endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{Customer, CustomerId, NewCustomer, OrderSummary};
use store::Store;

use super::SearchQuery;
use crate::AppState;
use crate::error::ApiError;

/// GET /customers: list all customers, or those matching `?search=`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = match query.search {
        Some(term) => state.directory.search(&term).await?,
        None => state.directory.list().await?,
    };
    Ok(Json(customers))
}

/// POST /customers: register a customer.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let customer = state.directory.create(req).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /customers/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CustomerId>,
) -> Result<Json<Customer>, ApiError> {
    Ok(Json(state.directory.find_by_id(id).await?))
}

/// PUT /customers/:id: replace every field but the id.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CustomerId>,
    Json(req): Json<NewCustomer>,
) -> Result<Json<Customer>, ApiError> {
    let customer = Customer {
        id,
        name: req.name,
        email: req.email,
        phone: req.phone,
        address: req.address,
    };
    Ok(Json(state.directory.update(customer).await?))
}

/// DELETE /customers/:id
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CustomerId>,
) -> Result<StatusCode, ApiError> {
    state.directory.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /customers/:id/orders: the customer's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn orders<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CustomerId>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(state.ledger.list_by_customer(id).await?))
}
