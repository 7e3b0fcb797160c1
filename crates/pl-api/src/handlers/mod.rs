//! API request handlers
//!
//! Handlers share a response shape: a created record comes back as
//! `{"message": "... created successfully", "<entity>": {...}}` with 201, a
//! single record as `{"<entity>": {...}}` and a deletion as `{"message"}`.

pub mod analytics;
pub mod auth;
pub mod documents;
pub mod expenses;
pub mod members;
pub mod partners;
pub mod products;
pub mod projects;
pub mod task_items;
pub mod tasks;
pub mod timesheets;
pub mod users;

use axum::{http::StatusCode, Json};
use pl_auth::{hash_password, verify_password};
use pl_core::Id;
use pl_db::{
    ProjectRepository, ProjectRow, Repository, RepositoryError, TaskRepository, TaskRow,
    UserRepository, UserRow,
};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::error::{ApiError, ApiResult};

/// `{key: value}`
pub(crate) fn wrap<T: Serialize>(key: &str, value: &T) -> ApiResult<Value> {
    let mut body = Map::new();
    body.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(Value::Object(body))
}

/// `{key: value}` plus a success message
pub(crate) fn with_message<T: Serialize>(message: String, key: &str, value: &T) -> ApiResult<Value> {
    let mut body = wrap(key, value)?;
    if let Value::Object(map) = &mut body {
        map.insert("message".into(), Value::String(message));
    }
    Ok(body)
}

/// 201 response for a newly created `label`
pub(crate) fn created<T: Serialize>(
    label: &str,
    key: &str,
    value: &T,
) -> ApiResult<(StatusCode, Json<Value>)> {
    created_with(format!("{} created successfully", label), key, value)
}

/// 201 response with a custom message
pub(crate) fn created_with<T: Serialize>(
    message: String,
    key: &str,
    value: &T,
) -> ApiResult<(StatusCode, Json<Value>)> {
    Ok((StatusCode::CREATED, Json(with_message(message, key, value)?)))
}

pub(crate) fn updated<T: Serialize>(label: &str, key: &str, value: &T) -> ApiResult<Json<Value>> {
    Ok(Json(with_message(format!("{} updated successfully", label), key, value)?))
}

pub(crate) fn deleted(label: &str) -> Json<Value> {
    message(format!("{} deleted successfully", label))
}

pub(crate) fn message(text: String) -> Json<Value> {
    let mut body = Map::new();
    body.insert("message".into(), Value::String(text));
    Json(Value::Object(body))
}

/// Serialize `row` and add the `extra` fields next to its own
pub(crate) fn merge<T: Serialize>(row: &T, extra: Vec<(&str, Value)>) -> ApiResult<Value> {
    let mut value = serde_json::to_value(row)?;
    if let Value::Object(map) = &mut value {
        for (key, field) in extra {
            map.insert(key.to_string(), field);
        }
    }
    Ok(value)
}

/// Load a record or fail with 404
pub(crate) fn found<T>(row: Option<T>, entity: &str, id: Id) -> ApiResult<T> {
    row.ok_or_else(|| ApiError::not_found(entity, id))
}

pub(crate) async fn require_project(pool: &SqlitePool, id: Id) -> ApiResult<ProjectRow> {
    let row = ProjectRepository::new(pool.clone()).find_by_id(id).await?;
    found(row, "Project", id)
}

pub(crate) async fn require_user(pool: &SqlitePool, id: Id) -> ApiResult<UserRow> {
    let row = UserRepository::new(pool.clone()).find_by_id(id).await?;
    found(row, "User", id)
}

pub(crate) async fn require_task(pool: &SqlitePool, id: Id) -> ApiResult<TaskRow> {
    let row = TaskRepository::new(pool.clone()).find_by_id(id).await?;
    found(row, "Task", id)
}

/// An optional task reference must name a task of `project_id`
/// Argon2 is CPU bound; hash on the blocking pool
pub(crate) async fn hash_password_async(password: String) -> ApiResult<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(hash)
}

pub(crate) async fn verify_password_async(password: String, stored_hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))
}

pub(crate) async fn check_task_in_project(
    pool: &SqlitePool,
    task_id: Option<Id>,
    project_id: Id,
) -> ApiResult<()> {
    let Some(task_id) = task_id else {
        return Ok(());
    };
    let task = require_task(pool, task_id).await?;
    if task.project_id != project_id {
        return Err(RepositoryError::Validation(format!(
            "Task {} does not belong to project {}",
            task_id, project_id
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Row {
        id: i64,
        name: &'static str,
    }

    #[test]
    fn test_created_shape() {
        let (status, Json(body)) = created("Project", "project", &Row { id: 1, name: "A" }).unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            body,
            json!({"message": "Project created successfully", "project": {"id": 1, "name": "A"}})
        );
    }

    #[test]
    fn test_merge_adds_fields() {
        let value = merge(&Row { id: 2, name: "B" }, vec![("members", json!([]))]).unwrap();
        assert_eq!(value, json!({"id": 2, "name": "B", "members": []}));
    }

    #[test]
    fn test_deleted_message() {
        let Json(body) = deleted("Task");
        assert_eq!(body, json!({"message": "Task deleted successfully"}));
    }

    #[test]
    fn test_found() {
        assert_eq!(found(Some(3), "Task", 3).unwrap(), 3);
        let err = found::<i32>(None, "Task", 9).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(m) if m == "Task 9 not found"));
    }
}
