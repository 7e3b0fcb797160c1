//! Partner repository
//!
//! Partners are the customers and vendors commercial documents are issued
//! to. A partner of type `both` appears in either list.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pl_core::{Id, PartnerRole, PartnerType, TextEnum};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::repository::{Pagination, Repository, RepositoryError, RepositoryResult};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PartnerRow {
    pub id: i64,
    pub name: String,
    pub partner_type: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

const SELECT_PARTNER: &str = r#"
    SELECT id, name, partner_type, email, phone, address, tax_id, is_active, created_at
    FROM partners
"#;

#[derive(Debug, Clone)]
pub struct CreatePartnerDto {
    pub name: String,
    pub partner_type: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
}

/// Partial update; `Some(None)` clears a contact field
#[derive(Debug, Clone, Default)]
pub struct UpdatePartnerDto {
    pub name: Option<String>,
    pub partner_type: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub tax_id: Option<Option<String>>,
    pub is_active: Option<bool>,
}

pub struct PartnerRepository {
    pool: SqlitePool,
}

impl PartnerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List partners, optionally restricted to one type. Filtering by
    /// `customer` or `vendor` also returns partners of type `both`.
    pub async fn find_all_by_type(
        &self,
        partner_type: Option<PartnerType>,
    ) -> RepositoryResult<Vec<PartnerRow>> {
        let filter = match partner_type {
            Some(PartnerType::Both) | None => None,
            Some(other) => Some(other.as_str()),
        };
        let only_both = matches!(partner_type, Some(PartnerType::Both));

        let sql = format!(
            "{} WHERE (?1 IS NULL OR partner_type = ?1 OR partner_type = 'both') \
             AND (?2 = 0 OR partner_type = 'both') ORDER BY name, id",
            SELECT_PARTNER
        );
        let rows = sqlx::query_as::<_, PartnerRow>(&sql)
            .bind(filter)
            .bind(only_both)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Partner usable in the given role, if one exists with that id
    pub async fn find_for_role(
        &self,
        id: Id,
        role: PartnerRole,
    ) -> RepositoryResult<Option<PartnerRow>> {
        let partner = self.find_by_id(id).await?;
        Ok(partner.filter(|p| {
            PartnerType::parse(&p.partner_type)
                .map(|t| t.accepts(role))
                .unwrap_or(false)
        }))
    }
}

#[async_trait]
impl Repository<PartnerRow, CreatePartnerDto, UpdatePartnerDto> for PartnerRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<PartnerRow>> {
        let sql = format!("{} WHERE id = ?1", SELECT_PARTNER);
        let row = sqlx::query_as::<_, PartnerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_all(&self, page: Pagination) -> RepositoryResult<Vec<PartnerRow>> {
        let sql = format!("{} ORDER BY name, id LIMIT ?1 OFFSET ?2", SELECT_PARTNER);
        let rows = sqlx::query_as::<_, PartnerRow>(&sql)
            .bind(page.sql_limit())
            .bind(page.sql_offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM partners")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreatePartnerDto) -> RepositoryResult<PartnerRow> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO partners (name, partner_type, email, phone, address, tax_id, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
            RETURNING id
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.partner_type)
        .bind(&dto.email)
        .bind(&dto.phone)
        .bind(&dto.address)
        .bind(&dto.tax_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(partner_id = id, partner_type = %dto.partner_type, "Partner created");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Partner", id))
    }

    async fn update(&self, id: Id, dto: UpdatePartnerDto) -> RepositoryResult<PartnerRow> {
        let result = sqlx::query(
            r#"
            UPDATE partners SET
                name = COALESCE(?2, name),
                partner_type = COALESCE(?3, partner_type),
                email = CASE WHEN ?9 THEN ?4 ELSE email END,
                phone = CASE WHEN ?10 THEN ?5 ELSE phone END,
                address = CASE WHEN ?11 THEN ?6 ELSE address END,
                tax_id = CASE WHEN ?12 THEN ?7 ELSE tax_id END,
                is_active = COALESCE(?8, is_active)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&dto.name)
        .bind(&dto.partner_type)
        .bind(dto.email.clone().flatten())
        .bind(dto.phone.clone().flatten())
        .bind(dto.address.clone().flatten())
        .bind(dto.tax_id.clone().flatten())
        .bind(dto.is_active)
        .bind(dto.email.is_some())
        .bind(dto.phone.is_some())
        .bind(dto.address.is_some())
        .bind(dto.tax_id.is_some())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Partner", id));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Partner", id))
    }

    /// Fails with a foreign key violation while documents reference the partner
    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM partners WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Partner", id));
        }

        tracing::debug!(partner_id = id, "Partner deleted");
        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM partners WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
