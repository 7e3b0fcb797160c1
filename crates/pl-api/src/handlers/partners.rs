//! Partner handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use pl_contracts::partners::{
    CreatePartnerContract, CreatePartnerParams, ListPartnersContract, ListPartnersParams,
    UpdatePartnerContract, UpdatePartnerParams,
};
use pl_contracts::Contract;
use pl_core::Id;
use pl_db::{PartnerRepository, Repository};
use serde_json::Value;

use super::{created, deleted, found, updated, wrap};
use crate::error::ApiResult;
use crate::extractors::{AppState, CurrentUser, JsonBody, QueryParams};

/// POST /partners
pub async fn create_partner(
    State(state): State<AppState>,
    _user: CurrentUser,
    JsonBody(params): JsonBody<CreatePartnerParams>,
) -> ApiResult<impl IntoResponse> {
    let dto = CreatePartnerContract.validate(params)?;
    let partner = PartnerRepository::new(state.pool()).create(dto).await?;
    created("Partner", "partner", &partner)
}

/// GET /partners?partner_type=customer|vendor|both
pub async fn list_partners(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(params): QueryParams<ListPartnersParams>,
) -> ApiResult<Json<Value>> {
    let partner_type = ListPartnersContract.validate(params)?;
    let partners = PartnerRepository::new(state.pool())
        .find_all_by_type(partner_type)
        .await?;
    Ok(Json(wrap("partners", &partners)?))
}

/// GET /partners/:id
pub async fn get_partner(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let row = PartnerRepository::new(state.pool()).find_by_id(id).await?;
    Ok(Json(wrap("partner", &found(row, "Partner", id)?)?))
}

/// PUT /partners/:id
pub async fn update_partner(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
    JsonBody(params): JsonBody<UpdatePartnerParams>,
) -> ApiResult<Json<Value>> {
    let dto = UpdatePartnerContract.validate(params)?;
    let partner = PartnerRepository::new(state.pool()).update(id, dto).await?;
    updated("Partner", "partner", &partner)
}

/// DELETE /partners/:id
///
/// Refused with 409 while documents still name the partner.
pub async fn delete_partner(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    PartnerRepository::new(state.pool()).delete(id).await?;
    Ok(deleted("Partner"))
}
