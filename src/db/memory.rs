//! 메모리 기반 저장소
//!
//! 개발 환경과 테스트에서 외부 DB 없이 협력 객체 계약을 충족합니다.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ClientRepository, FinancialProfileRepository, HistoryRepository, ProductCatalogStore};
use crate::domain::{
    Classification, Client, ClientHistory, ClientId, FinancialSnapshot, InvestmentRecord, Product,
    ProductCriteria, ProductDaySummary, ProductType, RiskProfile, SimulationRecord,
};
use crate::error::StoreError;

/// 메모리 상품 카탈로그. 원본 조회 횟수를 기록함
#[derive(Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<Uuid, Product>>,
    reads: AtomicU64,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: RwLock::new(products.into_iter().map(|p| (p.id, p)).collect()),
            reads: AtomicU64::new(0),
        }
    }

    /// 지금까지 원본 저장소에 도달한 읽기 호출 수
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    async fn filtered(&self, predicate: impl Fn(&Product) -> bool) -> Vec<Product> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let mut products: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| predicate(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        products
    }
}

#[async_trait]
impl ProductCatalogStore for InMemoryProductStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list_by_type(&self, product_type: ProductType) -> Result<Vec<Product>, StoreError> {
        Ok(self.filtered(|p| p.product_type == product_type).await)
    }

    async fn list_by_classification(&self, classification: Classification) -> Result<Vec<Product>, StoreError> {
        Ok(self.filtered(|p| p.recommended_classification == classification).await)
    }

    async fn query(&self, criteria: &ProductCriteria) -> Result<Vec<Product>, StoreError> {
        Ok(self.filtered(|p| criteria.matches(p)).await)
    }

    async fn list_all(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.filtered(|_| true).await)
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.products.read().await.contains_key(&id))
    }

    async fn insert(&self, product: &Product) -> Result<(), StoreError> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            return Err(StoreError::Backend(format!("상품 {} 이미 존재", product.id)));
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<bool, StoreError> {
        let mut products = self.products.write().await;
        match products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.products.write().await.remove(&id).is_some())
    }
}

/// 메모리 고객 데이터 저장소 (고객, 재무 설문, 이력, 프로필)
#[derive(Default)]
pub struct InMemoryClientStore {
    clients: RwLock<HashMap<ClientId, Client>>,
    profiles: RwLock<HashMap<ClientId, RiskProfile>>,
    snapshots: RwLock<HashMap<ClientId, FinancialSnapshot>>,
    histories: RwLock<HashMap<ClientId, ClientHistory>>,
}

impl InMemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_client(&self, client: Client) {
        self.clients.write().await.insert(client.id, client);
    }
}

#[async_trait]
impl ClientRepository for InMemoryClientStore {
    async fn get_client(&self, client_id: ClientId) -> Result<Option<Client>, StoreError> {
        Ok(self.clients.read().await.get(&client_id).cloned())
    }

    async fn get_risk_profile(&self, client_id: ClientId) -> Result<Option<RiskProfile>, StoreError> {
        Ok(self.profiles.read().await.get(&client_id).cloned())
    }

    async fn upsert_risk_profile(&self, profile: &RiskProfile) -> Result<(), StoreError> {
        self.profiles.write().await.insert(profile.client_id, profile.clone());
        Ok(())
    }
}

#[async_trait]
impl FinancialProfileRepository for InMemoryClientStore {
    async fn get_snapshot(&self, client_id: ClientId) -> Result<Option<FinancialSnapshot>, StoreError> {
        Ok(self.snapshots.read().await.get(&client_id).cloned())
    }

    async fn upsert_snapshot(&self, snapshot: &FinancialSnapshot) -> Result<(), StoreError> {
        self.snapshots.write().await.insert(snapshot.client_id, snapshot.clone());
        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for InMemoryClientStore {
    async fn get_history(&self, client_id: ClientId) -> Result<ClientHistory, StoreError> {
        Ok(self.histories.read().await.get(&client_id).cloned().unwrap_or_default())
    }

    async fn add_simulation(&self, record: &SimulationRecord) -> Result<(), StoreError> {
        self.histories
            .write()
            .await
            .entry(record.client_id)
            .or_default()
            .simulations
            .push(record.clone());
        Ok(())
    }

    async fn add_investment(&self, record: &InvestmentRecord) -> Result<(), StoreError> {
        self.histories
            .write()
            .await
            .entry(record.client_id)
            .or_default()
            .investments
            .push(record.clone());
        Ok(())
    }

    async fn list_simulations(&self) -> Result<Vec<SimulationRecord>, StoreError> {
        let mut simulations: Vec<SimulationRecord> = self
            .histories
            .read()
            .await
            .values()
            .flat_map(|history| history.simulations.iter().cloned())
            .collect();
        simulations.sort_by(|a, b| b.simulated_at.cmp(&a.simulated_at).then(a.id.cmp(&b.id)));
        Ok(simulations)
    }

    async fn simulations_by_product_day(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ProductDaySummary>, StoreError> {
        let histories = self.histories.read().await;

        // (날짜, 상품) → (상품명, 건수, 최종 금액 합)
        let mut groups: BTreeMap<(NaiveDate, Uuid), (String, u64, f64)> = BTreeMap::new();
        for record in histories.values().flat_map(|history| &history.simulations) {
            let day = record.simulated_at.date_naive();
            if day < start || day > end {
                continue;
            }
            let group = groups
                .entry((day, record.product_id))
                .or_insert_with(|| (record.product_name.clone(), 0, 0.0));
            group.1 += 1;
            group.2 += record.final_amount;
        }

        Ok(groups
            .into_iter()
            .map(|((day, product_id), (product_name, count, total))| ProductDaySummary {
                product_id,
                product_name,
                day,
                simulation_count: count,
                average_final_amount: total / count as f64,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RiskLevel;

    #[tokio::test]
    async fn test_product_store_counts_reads() {
        let product = Product::new("CDB", ProductType::Cdb, 0.12, RiskLevel::Low, 30, 100.0, true, Classification::Conservative);
        let store = InMemoryProductStore::with_products(vec![product.clone()]);

        assert_eq!(store.read_count(), 0);
        assert_eq!(store.get_by_id(product.id).await.unwrap(), Some(product.clone()));
        assert!(store.exists(product.id).await.unwrap());
        assert_eq!(store.list_by_type(ProductType::Cdb).await.unwrap().len(), 1);
        assert_eq!(store.read_count(), 3);

        assert!(store.insert(&product).await.is_err());
    }

    fn simulation(client_id: ClientId, product: &Product, final_amount: f64, at: &str) -> SimulationRecord {
        SimulationRecord {
            id: Uuid::new_v4(),
            client_id,
            product_id: product.id,
            product_name: product.name.clone(),
            product_type: product.product_type,
            risk_level: product.risk_level,
            allows_early_withdrawal: product.allows_early_withdrawal,
            amount: 1_000.0,
            final_amount,
            term_months: 12,
            simulated_at: at.parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_simulations_grouped_by_product_and_day() {
        let cdb = Product::new("CDB", ProductType::Cdb, 0.12, RiskLevel::Low, 30, 100.0, true, Classification::Conservative);
        let lci = Product::new("LCI", ProductType::Lci, 0.10, RiskLevel::Low, 90, 100.0, false, Classification::Conservative);
        let store = InMemoryClientStore::new();

        for record in [
            simulation(1, &cdb, 1_100.0, "2026-03-01T09:00:00Z"),
            simulation(2, &cdb, 1_300.0, "2026-03-01T23:59:00Z"),
            simulation(1, &lci, 1_050.0, "2026-03-01T12:00:00Z"),
            simulation(2, &cdb, 1_200.0, "2026-03-02T08:00:00Z"),
            simulation(3, &cdb, 9_999.0, "2026-03-05T08:00:00Z"),
        ] {
            store.add_simulation(&record).await.unwrap();
        }

        let day = |s: &str| s.parse::<NaiveDate>().unwrap();
        let summary = store
            .simulations_by_product_day(day("2026-03-01"), day("2026-03-02"))
            .await
            .unwrap();

        assert_eq!(summary.len(), 3);
        let first_day: Vec<_> = summary.iter().filter(|s| s.day == day("2026-03-01")).collect();
        assert_eq!(first_day.len(), 2);
        let cdb_first_day = first_day.iter().find(|s| s.product_id == cdb.id).unwrap();
        assert_eq!(cdb_first_day.simulation_count, 2);
        assert_eq!(cdb_first_day.product_name, "CDB");
        assert!((cdb_first_day.average_final_amount - 1_200.0).abs() < 1e-9);
        assert_eq!(summary[2].day, day("2026-03-02"));

        let all = store.list_simulations().await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].client_id, 3);
        assert!(all.windows(2).all(|w| w[0].simulated_at >= w[1].simulated_at));
    }

    #[tokio::test]
    async fn test_client_history_defaults_to_empty() {
        let store = InMemoryClientStore::new();
        let history = store.get_history(99).await.unwrap();
        assert_eq!(history.operation_count(), 0);
        assert!(store.get_client(99).await.unwrap().is_none());
    }
}
