//! Product handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use pl_contracts::products::{
    CreateProductContract, CreateProductParams, UpdateProductContract, UpdateProductParams,
};
use pl_contracts::Contract;
use pl_core::Id;
use pl_db::{Pagination, ProductRepository, Repository};
use serde_json::Value;

use super::{created, deleted, found, updated, wrap};
use crate::error::ApiResult;
use crate::extractors::{AppState, CurrentUser, JsonBody, QueryParams};

pub async fn create_product(
    State(state): State<AppState>,
    _user: CurrentUser,
    JsonBody(params): JsonBody<CreateProductParams>,
) -> ApiResult<impl IntoResponse> {
    let dto = CreateProductContract.validate(params)?;
    let product = ProductRepository::new(state.pool()).create(dto).await?;
    created("Product", "product", &product)
}

pub async fn list_products(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(page): QueryParams<Pagination>,
) -> ApiResult<Json<Value>> {
    let products = ProductRepository::new(state.pool()).find_all(page).await?;
    Ok(Json(wrap("products", &products)?))
}

pub async fn get_product(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let row = ProductRepository::new(state.pool()).find_by_id(id).await?;
    Ok(Json(wrap("product", &found(row, "Product", id)?)?))
}

pub async fn update_product(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
    JsonBody(params): JsonBody<UpdateProductParams>,
) -> ApiResult<Json<Value>> {
    let dto = UpdateProductContract.validate(params)?;
    let product = ProductRepository::new(state.pool()).update(id, dto).await?;
    updated("Product", "product", &product)
}

pub async fn delete_product(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    ProductRepository::new(state.pool()).delete(id).await?;
    Ok(deleted("Product"))
}
