//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{Money, NewProduct, Product, ProductId};
use serde::Deserialize;
use store::Store;

use super::SearchQuery;
use crate::AppState;
use crate::error::ApiError;

/// Body of `PUT /products/:id`. Stock is not part of it; a `stock` key in
/// the body is ignored.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
}

/// GET /products: list all products, or those matching `?search=`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = match query.search {
        Some(term) => state.catalog.search(&term).await?,
        None => state.catalog.list().await?,
    };
    Ok(Json(products))
}

/// POST /products: add a product to the catalog.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create(req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.find_by_id(id).await?))
}

/// PUT /products/:id: replace the name, description and price.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let current = state.catalog.find_by_id(id).await?;
    let product = Product {
        name: req.name,
        description: req.description,
        price: req.price,
        ..current
    };
    Ok(Json(state.catalog.update(product).await?))
}

/// DELETE /products/:id
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /products/:id/stock: add a signed delta to the stock.
#[tracing::instrument(skip(state))]
pub async fn adjust_stock<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
    Json(req): Json<StockAdjustment>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.adjust_stock(id, req.delta).await?))
}
