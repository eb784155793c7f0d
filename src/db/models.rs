use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::Product;
use crate::error::StoreError;

/// 상품 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub product_type: String,
    pub annual_yield: f64,
    pub risk_level: String,
    pub min_term_days: i64,
    pub min_investment: f64,
    pub allows_early_withdrawal: bool,
    pub recommended_classification: String,
}

impl From<&Product> for ProductRecord {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            product_type: product.product_type.as_str().to_string(),
            annual_yield: product.annual_yield,
            risk_level: product.risk_level.as_str().to_string(),
            min_term_days: i64::from(product.min_term_days),
            min_investment: product.min_investment,
            allows_early_withdrawal: product.allows_early_withdrawal,
            recommended_classification: product.recommended_classification.as_str().to_string(),
        }
    }
}

impl TryFrom<ProductRecord> for Product {
    type Error = StoreError;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&record.id)
            .map_err(|e| StoreError::Corrupt(format!("상품 id {}: {}", record.id, e)))?;
        let min_term_days = u32::try_from(record.min_term_days)
            .map_err(|_| StoreError::Corrupt(format!("상품 {} 최소 기간: {}", id, record.min_term_days)))?;

        Ok(Product {
            id,
            name: record.name,
            product_type: record.product_type.parse().map_err(StoreError::Corrupt)?,
            annual_yield: record.annual_yield,
            risk_level: record.risk_level.parse().map_err(StoreError::Corrupt)?,
            min_term_days,
            min_investment: record.min_investment,
            allows_early_withdrawal: record.allows_early_withdrawal,
            recommended_classification: record.recommended_classification.parse().map_err(StoreError::Corrupt)?,
        })
    }
}
