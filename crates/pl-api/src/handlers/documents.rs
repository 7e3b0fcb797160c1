//! Commercial document handlers
//!
//! One set of handlers serves sales orders, purchase orders, customer
//! invoices and vendor bills; the router attaches the [`DocumentKind`] as a
//! request extension. JSON field names follow the kind, so a sales order
//! carries `so_number`, `customer_id` and `order_date` while a vendor bill
//! carries `bill_number`, `vendor_id`, `bill_date` and `due_date`.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use pl_contracts::documents::{
    CreateDocumentContract, DocumentParams, LineContract, UpdateDocumentContract,
    UpdateLineContract,
};
use pl_contracts::Contract;
use pl_core::{DocumentKind, Id};
use pl_db::{
    DocumentRepository, DocumentRow, LineRow, Pagination, PartnerRepository, ProductRepository,
    Repository,
};
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;

use super::{created, created_with, deleted, found, message, require_project, updated, wrap};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, CurrentUser, JsonBody, QueryParams};

/// Document header under its kind's field names
pub fn document_json(kind: DocumentKind, row: &DocumentRow) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), json!(row.id));
    map.insert(kind.number_column().into(), json!(row.number));
    map.insert(kind.partner_column().into(), json!(row.partner_id));
    map.insert(kind.partner_name_field().into(), json!(row.partner_name));
    map.insert("project_id".into(), json!(row.project_id));
    map.insert(kind.date_column().into(), json!(row.document_date));
    if kind.has_due_date() {
        map.insert("due_date".into(), json!(row.due_date));
    }
    map.insert("status".into(), json!(row.status));
    map.insert("currency".into(), json!(row.currency));
    map.insert("notes".into(), json!(row.notes));
    map.insert("lines_count".into(), json!(row.lines_count));
    map.insert("total_amount".into(), json!(row.total_amount));
    map.insert("created_at".into(), json!(row.created_at));
    map.insert("updated_at".into(), json!(row.updated_at));
    Value::Object(map)
}

/// Document line; the price is `unit_price` or `unit_cost` by side
pub fn line_json(kind: DocumentKind, row: &LineRow) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), json!(row.id));
    map.insert(kind.parent_column().into(), json!(row.document_id));
    map.insert("product_id".into(), json!(row.product_id));
    map.insert("product_name".into(), json!(row.product_name));
    map.insert("description".into(), json!(row.description));
    map.insert("quantity".into(), json!(row.quantity));
    map.insert(kind.price_column().into(), json!(row.unit_price));
    map.insert("line_total".into(), json!(row.line_total));
    if kind.has_milestones() {
        map.insert("milestone_flag".into(), json!(row.milestone_flag));
    }
    Value::Object(map)
}

/// Header plus its lines
async fn document_with_lines(repo: &DocumentRepository, row: &DocumentRow) -> ApiResult<Value> {
    let kind = repo.kind();
    let lines = repo.lines(row.id).await?;
    let mut value = document_json(kind, row);
    if let Value::Object(map) = &mut value {
        let lines: Vec<Value> = lines.iter().map(|l| line_json(kind, l)).collect();
        map.insert("lines".into(), Value::Array(lines));
    }
    Ok(value)
}

async fn require_document(repo: &DocumentRepository, id: Id) -> ApiResult<DocumentRow> {
    found(repo.find_by_id(id).await?, repo.kind().label(), id)
}

async fn require_products(
    pool: &SqlitePool,
    product_ids: impl IntoIterator<Item = Id>,
) -> ApiResult<()> {
    let repo = ProductRepository::new(pool.clone());
    for id in product_ids {
        if !repo.exists(id).await? {
            return Err(ApiError::not_found("Product", id));
        }
    }
    Ok(())
}

/// POST /<documents>
///
/// The partner must exist and be usable on this side of the document.
/// Header and lines are written together or not at all.
pub async fn create_document(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    _user: CurrentUser,
    JsonBody(params): JsonBody<DocumentParams>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool();
    let dto = CreateDocumentContract { kind }.validate(params)?;

    PartnerRepository::new(pool.clone())
        .find_for_role(dto.partner_id, kind.partner_role())
        .await?
        .ok_or_else(|| ApiError::NotFound(kind.partner_not_found_message()))?;
    if let Some(project_id) = dto.project_id {
        require_project(&pool, project_id).await?;
    }
    let product_ids: Vec<Id> = dto.lines.iter().filter_map(|l| l.product_id).collect();
    require_products(&pool, product_ids).await?;

    let repo = DocumentRepository::new(pool, kind);
    let document = repo.create(dto).await?;
    tracing::info!(
        document = kind.singular_key(),
        document_id = document.id,
        number = %document.number,
        "Document created"
    );
    let body = document_with_lines(&repo, &document).await?;
    created(kind.label(), kind.singular_key(), &body)
}

/// GET /<documents>
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    _user: CurrentUser,
    QueryParams(page): QueryParams<Pagination>,
) -> ApiResult<Json<Value>> {
    let rows = DocumentRepository::new(state.pool(), kind).find_all(page).await?;
    let documents: Vec<Value> = rows.iter().map(|r| document_json(kind, r)).collect();
    Ok(Json(wrap(kind.table(), &documents)?))
}

/// GET /<documents>/:id
pub async fn get_document(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let repo = DocumentRepository::new(state.pool(), kind);
    let document = require_document(&repo, id).await?;
    let body = document_with_lines(&repo, &document).await?;
    Ok(Json(wrap(kind.singular_key(), &body)?))
}

/// PUT /<documents>/:id
pub async fn update_document(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    _user: CurrentUser,
    Path(id): Path<Id>,
    JsonBody(params): JsonBody<DocumentParams>,
) -> ApiResult<Json<Value>> {
    let repo = DocumentRepository::new(state.pool(), kind);
    require_document(&repo, id).await?;
    let dto = UpdateDocumentContract { kind }.validate(params)?;

    let document = repo.update(id, dto).await?;
    let body = document_with_lines(&repo, &document).await?;
    updated(kind.label(), kind.singular_key(), &body)
}

/// DELETE /<documents>/:id
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    DocumentRepository::new(state.pool(), kind).delete(id).await?;
    tracing::info!(document = kind.singular_key(), document_id = id, "Document deleted");
    Ok(deleted(kind.label()))
}

/// POST /<documents>/:id/lines
pub async fn add_line(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    _user: CurrentUser,
    Path(id): Path<Id>,
    JsonBody(params): JsonBody<DocumentParams>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool();
    let repo = DocumentRepository::new(pool.clone(), kind);
    require_document(&repo, id).await?;
    let line = LineContract { kind }.validate(params)?;
    require_products(&pool, line.product_id).await?;

    let row = repo.add_line(id, line).await?;
    created_with("Line added successfully".into(), "line", &line_json(kind, &row))
}

/// PUT /<documents>/:id/lines/:line_id
///
/// The line total is recomputed from the stored and submitted factors.
pub async fn update_line(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    _user: CurrentUser,
    Path((id, line_id)): Path<(Id, Id)>,
    JsonBody(params): JsonBody<DocumentParams>,
) -> ApiResult<Json<Value>> {
    let pool = state.pool();
    let repo = DocumentRepository::new(pool.clone(), kind);
    require_document(&repo, id).await?;
    let changes = UpdateLineContract { kind }.validate(params)?;
    require_products(&pool, changes.product_id.flatten()).await?;

    let row = repo.update_line(id, line_id, changes).await?;
    updated("Line", "line", &line_json(kind, &row))
}

/// DELETE /<documents>/:id/lines/:line_id
pub async fn delete_line(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    _user: CurrentUser,
    Path((id, line_id)): Path<(Id, Id)>,
) -> ApiResult<Json<Value>> {
    let repo = DocumentRepository::new(state.pool(), kind);
    require_document(&repo, id).await?;
    repo.delete_line(id, line_id).await?;
    Ok(message("Line deleted successfully".into()))
}
