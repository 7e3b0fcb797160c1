//! Project membership handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use pl_contracts::projects::{AddMemberContract, AddMemberParams};
use pl_contracts::Contract;
use pl_core::Id;
use pl_db::MemberRepository;
use serde_json::{json, Value};

use super::{created_with, message, require_project, require_user};
use crate::error::ApiResult;
use crate::extractors::{AppState, CurrentUser, JsonBody};

/// GET /projects/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<Id>,
) -> ApiResult<Json<Value>> {
    require_project(&state.pool(), project_id).await?;
    let members = MemberRepository::new(state.pool())
        .find_by_project(project_id)
        .await?;
    Ok(Json(json!({ "project_id": project_id, "members": members })))
}

/// POST /projects/:id/members
pub async fn add_member(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<Id>,
    JsonBody(params): JsonBody<AddMemberParams>,
) -> ApiResult<impl IntoResponse> {
    require_project(&state.pool(), project_id).await?;
    let member = AddMemberContract.validate(params)?;
    require_user(&state.pool(), member.user_id).await?;

    let row = MemberRepository::new(state.pool())
        .add(project_id, member.user_id, &member.role_in_project)
        .await?;
    tracing::debug!(project_id, user_id = row.user_id, "Member added");
    created_with("Member added successfully".into(), "member", &row)
}

/// DELETE /projects/:id/members/:member_id
pub async fn remove_member(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((project_id, member_id)): Path<(Id, Id)>,
) -> ApiResult<Json<Value>> {
    MemberRepository::new(state.pool())
        .remove(project_id, member_id)
        .await?;
    Ok(message("Member removed successfully".into()))
}
