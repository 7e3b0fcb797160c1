//! Product catalog repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pl_core::Id;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::repository::{Pagination, Repository, RepositoryError, RepositoryResult};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub product_code: Option<String>,
    pub description: Option<String>,
    pub product_type: String,
    pub sale_price: f64,
    pub cost_price: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

const SELECT_PRODUCT: &str = r#"
    SELECT id, name, product_code, description, product_type, sale_price,
           cost_price, is_active, created_at
    FROM products
"#;

#[derive(Debug, Clone)]
pub struct CreateProductDto {
    pub name: String,
    pub product_code: Option<String>,
    pub description: Option<String>,
    pub product_type: String,
    pub sale_price: f64,
    pub cost_price: f64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProductDto {
    pub name: Option<String>,
    pub product_code: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub product_type: Option<String>,
    pub sale_price: Option<f64>,
    pub cost_price: Option<f64>,
    pub is_active: Option<bool>,
}

pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn code_taken(&self, code: &str, except_id: Option<Id>) -> RepositoryResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE product_code = ?1 AND (?2 IS NULL OR id != ?2))",
        )
        .bind(code)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    pub async fn find_active(&self) -> RepositoryResult<Vec<ProductRow>> {
        let sql = format!("{} WHERE is_active = 1 ORDER BY name, id", SELECT_PRODUCT);
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl Repository<ProductRow, CreateProductDto, UpdateProductDto> for ProductRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ProductRow>> {
        let sql = format!("{} WHERE id = ?1", SELECT_PRODUCT);
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_all(&self, page: Pagination) -> RepositoryResult<Vec<ProductRow>> {
        let sql = format!("{} ORDER BY name, id LIMIT ?1 OFFSET ?2", SELECT_PRODUCT);
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(page.sql_limit())
            .bind(page.sql_offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateProductDto) -> RepositoryResult<ProductRow> {
        if let Some(code) = &dto.product_code {
            if self.code_taken(code, None).await? {
                return Err(RepositoryError::Conflict("Product code already exists".into()));
            }
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (
                name, product_code, description, product_type, sale_price,
                cost_price, is_active, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
            RETURNING id
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.product_code)
        .bind(&dto.description)
        .bind(&dto.product_type)
        .bind(dto.sale_price)
        .bind(dto.cost_price)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(product_id = id, "Product created");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Product", id))
    }

    async fn update(&self, id: Id, dto: UpdateProductDto) -> RepositoryResult<ProductRow> {
        if let Some(Some(code)) = &dto.product_code {
            if self.code_taken(code, Some(id)).await? {
                return Err(RepositoryError::Conflict("Product code already exists".into()));
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE(?2, name),
                product_code = CASE WHEN ?9 THEN ?3 ELSE product_code END,
                description = CASE WHEN ?10 THEN ?4 ELSE description END,
                product_type = COALESCE(?5, product_type),
                sale_price = COALESCE(?6, sale_price),
                cost_price = COALESCE(?7, cost_price),
                is_active = COALESCE(?8, is_active)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&dto.name)
        .bind(dto.product_code.clone().flatten())
        .bind(dto.description.clone().flatten())
        .bind(&dto.product_type)
        .bind(dto.sale_price)
        .bind(dto.cost_price)
        .bind(dto.is_active)
        .bind(dto.product_code.is_some())
        .bind(dto.description.is_some())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Product", id));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Product", id))
    }

    /// Document lines keep their description and lose the product link
    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Product", id));
        }

        tracing::debug!(product_id = id, "Product deleted");
        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::Database;

    pub(crate) fn new_product(name: &str, code: Option<&str>) -> CreateProductDto {
        CreateProductDto {
            name: name.to_string(),
            product_code: code.map(str::to_string),
            description: None,
            product_type: "service".to_string(),
            sale_price: 100.0,
            cost_price: 60.0,
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_is_conflict() {
        let db = Database::in_memory().await.unwrap();
        let repo = ProductRepository::new(db.pool().clone());
        repo.create(new_product("Consulting", Some("SRV-1"))).await.unwrap();

        let err = repo
            .create(new_product("Other", Some("SRV-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // products without a code never collide
        repo.create(new_product("A", None)).await.unwrap();
        repo.create(new_product("B", None)).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_keeps_own_code() {
        let db = Database::in_memory().await.unwrap();
        let repo = ProductRepository::new(db.pool().clone());
        let product = repo.create(new_product("Consulting", Some("SRV-1"))).await.unwrap();

        let updated = repo
            .update(
                product.id,
                UpdateProductDto {
                    product_code: Some(Some("SRV-1".into())),
                    sale_price: Some(120.0),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.sale_price, 120.0);
        assert_eq!(updated.cost_price, 60.0);
        assert!(repo.find_active().await.unwrap().is_empty());
    }
}
