//! Assignments, comments and attachments hanging off a task

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use pl_contracts::tasks::{
    AssignContract, AssignParams, AttachmentContract, AttachmentParams, CommentContract,
    CommentParams,
};
use pl_contracts::Contract;
use pl_core::Id;
use pl_db::{AssignmentRepository, AttachmentRepository, CommentRepository};
use serde_json::{json, Value};

use super::{created, created_with, deleted, found, message, require_task, require_user};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, CurrentUser, JsonBody};

/// POST /tasks/:id/assignments
pub async fn assign_task(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(task_id): Path<Id>,
    JsonBody(params): JsonBody<AssignParams>,
) -> ApiResult<impl IntoResponse> {
    require_task(&state.pool(), task_id).await?;
    let user_id = AssignContract.validate(params)?;
    require_user(&state.pool(), user_id).await?;

    let assignment = AssignmentRepository::new(state.pool())
        .assign(task_id, user_id)
        .await?;
    created_with("Task assigned successfully".into(), "assignment", &assignment)
}

/// DELETE /tasks/:id/assignments/:assignment_id
pub async fn unassign_task(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((task_id, assignment_id)): Path<(Id, Id)>,
) -> ApiResult<Json<Value>> {
    AssignmentRepository::new(state.pool())
        .unassign(task_id, assignment_id)
        .await?;
    Ok(message("Assignment removed successfully".into()))
}

/// POST /tasks/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<Id>,
    JsonBody(params): JsonBody<CommentParams>,
) -> ApiResult<impl IntoResponse> {
    require_task(&state.pool(), task_id).await?;
    let text = CommentContract.validate(params)?;

    let comment = CommentRepository::new(state.pool())
        .create(task_id, user.id, &text)
        .await?;
    created_with("Comment added successfully".into(), "comment", &comment)
}

/// GET /tasks/:id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(task_id): Path<Id>,
) -> ApiResult<Json<Value>> {
    require_task(&state.pool(), task_id).await?;
    let comments = CommentRepository::new(state.pool()).find_by_task(task_id).await?;
    Ok(Json(json!({ "task_id": task_id, "comments": comments })))
}

/// DELETE /tasks/:id/comments/:comment_id
///
/// Only the author may delete a comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((task_id, comment_id)): Path<(Id, Id)>,
) -> ApiResult<Json<Value>> {
    let repo = CommentRepository::new(state.pool());
    let comment = found(repo.find(task_id, comment_id).await?, "Comment", comment_id)?;

    if comment.user_id != Some(user.id) {
        return Err(ApiError::forbidden("Only the author can delete this comment"));
    }

    repo.delete(comment_id).await?;
    Ok(deleted("Comment"))
}

/// POST /tasks/:id/attachments
pub async fn add_attachment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<Id>,
    JsonBody(params): JsonBody<AttachmentParams>,
) -> ApiResult<impl IntoResponse> {
    require_task(&state.pool(), task_id).await?;
    let attachment = AttachmentContract.validate(params)?;

    let row = AttachmentRepository::new(state.pool())
        .create(task_id, user.id, &attachment.file_name, &attachment.file_url)
        .await?;
    created("Attachment", "attachment", &row)
}

/// GET /tasks/:id/attachments
pub async fn list_attachments(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(task_id): Path<Id>,
) -> ApiResult<Json<Value>> {
    require_task(&state.pool(), task_id).await?;
    let attachments = AttachmentRepository::new(state.pool())
        .find_by_task(task_id)
        .await?;
    Ok(Json(json!({ "task_id": task_id, "attachments": attachments })))
}

/// DELETE /tasks/:id/attachments/:attachment_id
pub async fn delete_attachment(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((task_id, attachment_id)): Path<(Id, Id)>,
) -> ApiResult<Json<Value>> {
    AttachmentRepository::new(state.pool())
        .delete(task_id, attachment_id)
        .await?;
    Ok(deleted("Attachment"))
}
