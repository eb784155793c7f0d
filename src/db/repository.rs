use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use super::models::ProductRecord;
use super::ProductCatalogStore;
use crate::domain::{Classification, Product, ProductCriteria, ProductType};
use crate::error::StoreError;

const PRODUCT_COLUMNS: &str = "id, name, product_type, annual_yield, risk_level, min_term_days, \
     min_investment, allows_early_withdrawal, recommended_classification";

/// SQLite 상품 카탈로그 저장소
pub struct SqliteProductStore {
    pool: SqlitePool,
}

impl SqliteProductStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn into_products(records: Vec<ProductRecord>) -> Result<Vec<Product>, StoreError> {
        records.into_iter().map(Product::try_from).collect()
    }
}

#[async_trait]
impl ProductCatalogStore for SqliteProductStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products WHERE id = ?",
            PRODUCT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        record.map(Product::try_from).transpose()
    }

    async fn list_by_type(&self, product_type: ProductType) -> Result<Vec<Product>, StoreError> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products WHERE product_type = ? ORDER BY annual_yield DESC",
            PRODUCT_COLUMNS
        ))
        .bind(product_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        Self::into_products(records)
    }

    async fn list_by_classification(&self, classification: Classification) -> Result<Vec<Product>, StoreError> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products WHERE recommended_classification = ? ORDER BY annual_yield DESC",
            PRODUCT_COLUMNS
        ))
        .bind(classification.as_str())
        .fetch_all(&self.pool)
        .await?;

        Self::into_products(records)
    }

    async fn query(&self, criteria: &ProductCriteria) -> Result<Vec<Product>, StoreError> {
        // NULL 파라미터는 해당 필터를 끔
        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products
             WHERE (?1 IS NULL OR min_investment <= ?1)
               AND (?2 IS NULL OR risk_level = ?2)
               AND (?3 IS NULL OR allows_early_withdrawal = ?3)
             ORDER BY annual_yield DESC",
            PRODUCT_COLUMNS
        ))
        .bind(criteria.max_min_investment)
        .bind(criteria.risk_level.map(|r| r.as_str()))
        .bind(criteria.allows_early_withdrawal)
        .fetch_all(&self.pool)
        .await?;

        Self::into_products(records)
    }

    async fn list_all(&self) -> Result<Vec<Product>, StoreError> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products ORDER BY name ASC",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Self::into_products(records)
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn insert(&self, product: &Product) -> Result<(), StoreError> {
        let record = ProductRecord::from(product);
        sqlx::query(
            "INSERT INTO products
             (id, name, product_type, annual_yield, risk_level, min_term_days, min_investment,
              allows_early_withdrawal, recommended_classification)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.product_type)
        .bind(record.annual_yield)
        .bind(&record.risk_level)
        .bind(record.min_term_days)
        .bind(record.min_investment)
        .bind(record.allows_early_withdrawal)
        .bind(&record.recommended_classification)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<bool, StoreError> {
        let record = ProductRecord::from(product);
        let result = sqlx::query(
            "UPDATE products
             SET name = ?, product_type = ?, annual_yield = ?, risk_level = ?, min_term_days = ?,
                 min_investment = ?, allows_early_withdrawal = ?, recommended_classification = ?,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?"
        )
        .bind(&record.name)
        .bind(&record.product_type)
        .bind(record.annual_yield)
        .bind(&record.risk_level)
        .bind(record.min_term_days)
        .bind(record.min_investment)
        .bind(record.allows_early_withdrawal)
        .bind(&record.recommended_classification)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
