pub mod memory;
pub mod models;
pub mod repository;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::info;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Error as SqlxError;
use uuid::Uuid;

use crate::domain::{
    Classification, Client, ClientHistory, ClientId, FinancialSnapshot, InvestmentRecord, Product,
    ProductCriteria, ProductDaySummary, ProductType, RiskProfile, SimulationRecord,
};
use crate::error::StoreError;

pub use memory::{InMemoryClientStore, InMemoryProductStore};
pub use repository::SqliteProductStore;

/// 고객 및 위험 성향 프로필 저장소
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn get_client(&self, client_id: ClientId) -> Result<Option<Client>, StoreError>;
    async fn get_risk_profile(&self, client_id: ClientId) -> Result<Option<RiskProfile>, StoreError>;
    async fn upsert_risk_profile(&self, profile: &RiskProfile) -> Result<(), StoreError>;
}

/// 재무 설문 저장소
#[async_trait]
pub trait FinancialProfileRepository: Send + Sync {
    async fn get_snapshot(&self, client_id: ClientId) -> Result<Option<FinancialSnapshot>, StoreError>;
    async fn upsert_snapshot(&self, snapshot: &FinancialSnapshot) -> Result<(), StoreError>;
}

/// 시뮬레이션 및 확정 투자 이력 저장소
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn get_history(&self, client_id: ClientId) -> Result<ClientHistory, StoreError>;
    async fn add_simulation(&self, record: &SimulationRecord) -> Result<(), StoreError>;
    async fn add_investment(&self, record: &InvestmentRecord) -> Result<(), StoreError>;
    /// 모든 고객의 시뮬레이션 (최신순)
    async fn list_simulations(&self) -> Result<Vec<SimulationRecord>, StoreError>;
    /// `start..=end` 날짜의 시뮬레이션을 (날짜, 상품)별로 집계
    async fn simulations_by_product_day(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ProductDaySummary>, StoreError>;
}

/// 상품 카탈로그 원본 저장소. 캐시 미스 시 조회됨
#[async_trait]
pub trait ProductCatalogStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn list_by_type(&self, product_type: ProductType) -> Result<Vec<Product>, StoreError>;
    async fn list_by_classification(&self, classification: Classification) -> Result<Vec<Product>, StoreError>;
    async fn query(&self, criteria: &ProductCriteria) -> Result<Vec<Product>, StoreError>;
    async fn list_all(&self) -> Result<Vec<Product>, StoreError>;
    async fn exists(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn insert(&self, product: &Product) -> Result<(), StoreError>;
    /// 존재하지 않는 상품이면 `false`
    async fn update(&self, product: &Product) -> Result<bool, StoreError>;
    /// 존재하지 않는 상품이면 `false`
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// SQLite 데이터베이스 초기화 및 연결
///
/// `sqlite::memory:`는 연결마다 별도 DB가 생기므로 `max_connections`를 1로 지정해야 함
pub async fn init_database(database_url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    info!("🗄️  SQLite 데이터베이스 초기화 중: {}", database_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    create_tables(&pool).await?;

    info!("✅ 데이터베이스 초기화 완료");

    Ok(pool)
}

/// 필요한 테이블 생성
async fn create_tables(pool: &SqlitePool) -> Result<(), SqlxError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            product_type TEXT NOT NULL,
            annual_yield REAL NOT NULL,
            risk_level TEXT NOT NULL,
            min_term_days INTEGER NOT NULL,
            min_investment REAL NOT NULL,
            allows_early_withdrawal INTEGER NOT NULL,
            recommended_classification TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )"
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_type ON products(product_type)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_classification ON products(recommended_classification)")
        .execute(pool)
        .await?;

    Ok(())
}
