//! Commercial document repository
//!
//! One repository serves all four document kinds. Table and column names
//! come from [`DocumentKind`], so the SQL is assembled per kind; every value
//! is still bound as a parameter.
//!
//! A header and the lines submitted with it are written in one transaction.
//! Line totals are always computed here from quantity and unit price.

use chrono::{DateTime, NaiveDate, Utc};
use pl_core::{line_total, DocumentKind, Id};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::repository::{Pagination, RepositoryError, RepositoryResult};

/// Document header with aggregated line figures
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentRow {
    pub id: i64,
    pub number: String,
    pub partner_id: i64,
    pub partner_name: Option<String>,
    pub project_id: Option<i64>,
    pub document_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: String,
    pub currency: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_amount: f64,
    pub lines_count: i64,
}

/// A document line; `unit_price` holds `unit_cost` on the buying side
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LineRow {
    pub id: i64,
    pub document_id: i64,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub line_total: f64,
    pub milestone_flag: bool,
}

#[derive(Debug, Clone)]
pub struct NewLineDto {
    pub product_id: Option<Id>,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub milestone_flag: bool,
}

/// Partial line update; `product_id: Some(None)` unlinks the product
#[derive(Debug, Clone, Default)]
pub struct UpdateLineDto {
    pub product_id: Option<Option<Id>>,
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub milestone_flag: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct CreateDocumentDto {
    pub number: String,
    pub partner_id: Id,
    pub project_id: Option<Id>,
    pub document_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: String,
    pub currency: String,
    pub notes: Option<String>,
    pub lines: Vec<NewLineDto>,
}

/// Partial header update; `Some(None)` clears notes or the due date
#[derive(Debug, Clone, Default)]
pub struct UpdateDocumentDto {
    pub status: Option<String>,
    pub currency: Option<String>,
    pub notes: Option<Option<String>>,
    pub document_date: Option<NaiveDate>,
    pub due_date: Option<Option<NaiveDate>>,
}

pub struct DocumentRepository {
    pool: SqlitePool,
    kind: DocumentKind,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool, kind: DocumentKind) -> Self {
        Self { pool, kind }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    fn select_document(&self) -> String {
        let k = self.kind;
        let due = if k.has_due_date() { "d.due_date" } else { "NULL" };
        format!(
            r#"
            SELECT d.id, d.{number} AS number, d.{partner} AS partner_id,
                   pt.name AS partner_name, d.project_id,
                   d.{date} AS document_date, {due} AS due_date,
                   d.status, d.currency, d.notes, d.created_at, d.updated_at,
                   (SELECT TOTAL(l.line_total) FROM {lines} l WHERE l.{parent} = d.id) AS total_amount,
                   (SELECT COUNT(*) FROM {lines} l WHERE l.{parent} = d.id) AS lines_count
            FROM {table} d
            LEFT JOIN partners pt ON pt.id = d.{partner}
            "#,
            number = k.number_column(),
            partner = k.partner_column(),
            date = k.date_column(),
            due = due,
            lines = k.lines_table(),
            parent = k.parent_column(),
            table = k.table(),
        )
    }

    fn select_line(&self) -> String {
        let k = self.kind;
        let milestone = if k.has_milestones() { "l.milestone_flag" } else { "0" };
        format!(
            r#"
            SELECT l.id, l.{parent} AS document_id, l.product_id, p.name AS product_name,
                   l.description, l.quantity, l.{price} AS unit_price, l.line_total,
                   {milestone} AS milestone_flag
            FROM {lines} l
            LEFT JOIN products p ON p.id = l.product_id
            "#,
            parent = k.parent_column(),
            price = k.price_column(),
            milestone = milestone,
            lines = k.lines_table(),
        )
    }

    pub async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<DocumentRow>> {
        let sql = format!("{} WHERE d.id = ?1", self.select_document());
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_all(&self, page: Pagination) -> RepositoryResult<Vec<DocumentRow>> {
        let sql = format!(
            "{} ORDER BY d.{} DESC, d.id DESC LIMIT ?1 OFFSET ?2",
            self.select_document(),
            self.kind.date_column()
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(page.sql_limit())
            .bind(page.sql_offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> RepositoryResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.kind.table());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", self.kind.table());
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn number_taken(&self, number: &str) -> RepositoryResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
            self.kind.table(),
            self.kind.number_column()
        );
        let taken: bool = sqlx::query_scalar(&sql)
            .bind(number)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }

    /// Insert a header and its lines atomically
    pub async fn create(&self, dto: CreateDocumentDto) -> RepositoryResult<DocumentRow> {
        let k = self.kind;
        if self.number_taken(&dto.number).await? {
            return Err(RepositoryError::Conflict(format!(
                "{} number already exists",
                k.label()
            )));
        }

        let (due_column, due_param) = if k.has_due_date() {
            (", due_date", ", ?9")
        } else {
            ("", "")
        };
        let sql = format!(
            r#"
            INSERT INTO {table} (
                {number}, {partner}, project_id, {date}, status, currency, notes,
                created_at, updated_at{due_column}
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8{due_param})
            RETURNING id
            "#,
            table = k.table(),
            number = k.number_column(),
            partner = k.partner_column(),
            date = k.date_column(),
            due_column = due_column,
            due_param = due_param,
        );

        let mut tx = self.pool.begin().await?;

        let mut insert = sqlx::query_scalar::<_, i64>(&sql)
            .bind(&dto.number)
            .bind(dto.partner_id)
            .bind(dto.project_id)
            .bind(dto.document_date)
            .bind(&dto.status)
            .bind(&dto.currency)
            .bind(&dto.notes)
            .bind(Utc::now());
        if k.has_due_date() {
            insert = insert.bind(dto.due_date);
        }
        let id = insert.fetch_one(&mut *tx).await?;

        for line in &dto.lines {
            insert_line(&mut tx, k, id, line).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            document = k.singular_key(),
            document_id = id,
            lines = dto.lines.len(),
            "Document created"
        );

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(k.label(), id))
    }

    pub async fn update(&self, id: Id, dto: UpdateDocumentDto) -> RepositoryResult<DocumentRow> {
        let k = self.kind;
        let due_clause = if k.has_due_date() {
            ", due_date = CASE WHEN ?9 THEN ?8 ELSE due_date END"
        } else {
            ""
        };
        let sql = format!(
            r#"
            UPDATE {table} SET
                status = COALESCE(?2, status),
                currency = COALESCE(?3, currency),
                notes = CASE WHEN ?7 THEN ?4 ELSE notes END,
                {date} = COALESCE(?5, {date}),
                updated_at = ?6{due_clause}
            WHERE id = ?1
            "#,
            table = k.table(),
            date = k.date_column(),
            due_clause = due_clause,
        );

        let mut update = sqlx::query(&sql)
            .bind(id)
            .bind(&dto.status)
            .bind(&dto.currency)
            .bind(dto.notes.clone().flatten())
            .bind(dto.document_date)
            .bind(Utc::now())
            .bind(dto.notes.is_some());
        if k.has_due_date() {
            update = update.bind(dto.due_date.flatten()).bind(dto.due_date.is_some());
        }
        let result = update.execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(k.label(), id));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(k.label(), id))
    }

    /// Lines are removed with the header
    pub async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", self.kind.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(self.kind.label(), id));
        }

        tracing::debug!(document = self.kind.singular_key(), document_id = id, "Document deleted");
        Ok(())
    }

    pub async fn lines(&self, document_id: Id) -> RepositoryResult<Vec<LineRow>> {
        let sql = format!(
            "{} WHERE l.{} = ?1 ORDER BY l.id",
            self.select_line(),
            self.kind.parent_column()
        );
        let rows = sqlx::query_as::<_, LineRow>(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn find_line(&self, document_id: Id, line_id: Id) -> RepositoryResult<Option<LineRow>> {
        let sql = format!(
            "{} WHERE l.id = ?1 AND l.{} = ?2",
            self.select_line(),
            self.kind.parent_column()
        );
        let row = sqlx::query_as::<_, LineRow>(&sql)
            .bind(line_id)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn add_line(&self, document_id: Id, line: NewLineDto) -> RepositoryResult<LineRow> {
        let mut tx = self.pool.begin().await?;
        let line_id = insert_line(&mut tx, self.kind, document_id, &line).await?;
        touch(&mut tx, self.kind, document_id).await?;
        tx.commit().await?;

        self.find_line(document_id, line_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Line", line_id))
    }

    /// Partial line update; the total follows whichever factor changed
    pub async fn update_line(
        &self,
        document_id: Id,
        line_id: Id,
        dto: UpdateLineDto,
    ) -> RepositoryResult<LineRow> {
        let k = self.kind;
        let mut tx = self.pool.begin().await?;

        let current_sql = format!(
            "SELECT quantity, {} FROM {} WHERE id = ?1 AND {} = ?2",
            k.price_column(),
            k.lines_table(),
            k.parent_column()
        );
        let current: Option<(f64, f64)> = sqlx::query_as(&current_sql)
            .bind(line_id)
            .bind(document_id)
            .fetch_optional(&mut *tx)
            .await?;
        let (quantity, unit_price) = current.ok_or_else(|| RepositoryError::not_found("Line", line_id))?;

        let quantity = dto.quantity.unwrap_or(quantity);
        let unit_price = dto.unit_price.unwrap_or(unit_price);

        let milestone_clause = if k.has_milestones() {
            ", milestone_flag = COALESCE(?8, milestone_flag)"
        } else {
            ""
        };
        let sql = format!(
            r#"
            UPDATE {lines} SET
                product_id = CASE WHEN ?7 THEN ?2 ELSE product_id END,
                description = COALESCE(?3, description),
                quantity = ?4,
                {price} = ?5,
                line_total = ?6{milestone_clause}
            WHERE id = ?1
            "#,
            lines = k.lines_table(),
            price = k.price_column(),
            milestone_clause = milestone_clause,
        );
        let mut update = sqlx::query(&sql)
            .bind(line_id)
            .bind(dto.product_id.flatten())
            .bind(&dto.description)
            .bind(quantity)
            .bind(unit_price)
            .bind(line_total(quantity, unit_price))
            .bind(dto.product_id.is_some());
        if k.has_milestones() {
            update = update.bind(dto.milestone_flag);
        }
        update.execute(&mut *tx).await?;

        touch(&mut tx, k, document_id).await?;
        tx.commit().await?;

        self.find_line(document_id, line_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Line", line_id))
    }

    pub async fn delete_line(&self, document_id: Id, line_id: Id) -> RepositoryResult<()> {
        let k = self.kind;
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "DELETE FROM {} WHERE id = ?1 AND {} = ?2",
            k.lines_table(),
            k.parent_column()
        );
        let result = sqlx::query(&sql)
            .bind(line_id)
            .bind(document_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Line", line_id));
        }

        touch(&mut tx, k, document_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn insert_line(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: Id,
    line: &NewLineDto,
) -> RepositoryResult<Id> {
    let (milestone_column, milestone_param) = if kind.has_milestones() {
        (", milestone_flag", ", ?7")
    } else {
        ("", "")
    };
    let sql = format!(
        r#"
        INSERT INTO {lines} (
            {parent}, product_id, description, quantity, {price}, line_total{milestone_column}
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6{milestone_param})
        RETURNING id
        "#,
        lines = kind.lines_table(),
        parent = kind.parent_column(),
        price = kind.price_column(),
        milestone_column = milestone_column,
        milestone_param = milestone_param,
    );

    let mut insert = sqlx::query_scalar::<_, i64>(&sql)
        .bind(document_id)
        .bind(line.product_id)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line_total(line.quantity, line.unit_price));
    if kind.has_milestones() {
        insert = insert.bind(line.milestone_flag);
    }
    let id = insert.fetch_one(&mut *conn).await?;
    Ok(id)
}

async fn touch(conn: &mut SqliteConnection, kind: DocumentKind, document_id: Id) -> RepositoryResult<()> {
    let sql = format!("UPDATE {} SET updated_at = ?2 WHERE id = ?1", kind.table());
    let result = sqlx::query(&sql)
        .bind(document_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::not_found(kind.label(), document_id));
    }
    Ok(())
}
