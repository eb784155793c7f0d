//! 상품 카탈로그 캐시 데코레이터
//!
//! 원본 저장소(`ProductCatalogStore`)를 감싸 cache-aside 읽기와 쓰기 후 무효화를 제공합니다.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::keys::CacheKey;
use super::tiered::TieredCache;
use crate::db::ProductCatalogStore;
use crate::domain::{Classification, Product, ProductCriteria, ProductType};
use crate::error::{AdvisorError, AdvisorResult};
use crate::util::cancellable;

/// 변경 시작 전에만 취소를 확인함
///
/// 시작한 원본 변경은 취소와 경합시키지 않음. 확정된 변경 뒤에는 항상 무효화가 실행됨
fn check_not_cancelled(cancel: &CancellationToken) -> AdvisorResult<()> {
    if cancel.is_cancelled() {
        Err(AdvisorError::Cancelled)
    } else {
        Ok(())
    }
}

/// 캐시가 적용된 상품 카탈로그
pub struct CachedProductCatalog {
    inner: Arc<dyn ProductCatalogStore>,
    cache: Arc<TieredCache>,
    /// 단건(`id`)과 전체 목록(`all`) 키의 TTL
    product_ttl: Duration,
}

impl CachedProductCatalog {
    pub fn new(inner: Arc<dyn ProductCatalogStore>, cache: Arc<TieredCache>, product_ttl: Duration) -> Self {
        Self {
            inner,
            cache,
            product_ttl,
        }
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    fn list_ttl(&self) -> Duration {
        self.cache.settings().shared_ttl
    }

    /// id로 조회. 존재하는 상품만 캐시됨
    pub async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> AdvisorResult<Option<Product>> {
        let key = CacheKey::ProductId(id).as_key();
        if let Some(product) = self.cache.get::<Product>(&key, cancel).await {
            return Ok(Some(product));
        }

        let product = cancellable(cancel, self.inner.get_by_id(id)).await?;
        if let Some(product) = &product {
            self.cache.set(&key, product, self.product_ttl, cancel).await;
        }
        Ok(product)
    }

    pub async fn get_by_type(&self, product_type: ProductType, cancel: &CancellationToken) -> AdvisorResult<Vec<Product>> {
        let key = CacheKey::ProductType(product_type).as_key();
        self.cache
            .get_or_fetch(&key, self.list_ttl(), cancel, move || async move {
                self.inner.list_by_type(product_type).await.map_err(AdvisorError::from)
            })
            .await
    }

    pub async fn get_by_classification(
        &self,
        classification: Classification,
        cancel: &CancellationToken,
    ) -> AdvisorResult<Vec<Product>> {
        let key = CacheKey::Classification(classification).as_key();
        self.cache
            .get_or_fetch(&key, self.list_ttl(), cancel, move || async move {
                self.inner.list_by_classification(classification).await.map_err(AdvisorError::from)
            })
            .await
    }

    /// 조건 검색. 결과 키는 쓰기 시 무효화되지 않고 TTL로만 만료됨
    pub async fn query(&self, criteria: &ProductCriteria, cancel: &CancellationToken) -> AdvisorResult<Vec<Product>> {
        let key = CacheKey::Criteria(criteria.clone()).as_key();
        self.cache
            .get_or_fetch(&key, self.list_ttl(), cancel, move || async move {
                self.inner.query(criteria).await.map_err(AdvisorError::from)
            })
            .await
    }

    pub async fn get_all(&self, cancel: &CancellationToken) -> AdvisorResult<Vec<Product>> {
        let key = CacheKey::All.as_key();
        self.cache
            .get_or_fetch(&key, self.product_ttl, cancel, move || async move {
                self.inner.list_all().await.map_err(AdvisorError::from)
            })
            .await
    }

    /// 존재 여부. id 키가 캐시에 있으면 원본을 조회하지 않음
    pub async fn exists(&self, id: Uuid, cancel: &CancellationToken) -> AdvisorResult<bool> {
        let key = CacheKey::ProductId(id).as_key();
        if self.cache.get::<Product>(&key, cancel).await.is_some() {
            return Ok(true);
        }

        cancellable(cancel, self.inner.exists(id)).await
    }

    /// 상품 추가 후 관련 키 무효화
    pub async fn add(&self, product: &Product, cancel: &CancellationToken) -> AdvisorResult<()> {
        check_not_cancelled(cancel)?;
        self.inner.insert(product).await?;
        self.cache.invalidate(&CacheKey::invalidation_set(product)).await;

        info!("상품 추가: {} ({})", product.name, product.id);
        Ok(())
    }

    /// 상품 수정 후 관련 키 무효화
    ///
    /// 유형이 바뀐 경우 이전 유형 목록에도 남아 있으므로 이전 값의 키도 함께 지움
    pub async fn update(&self, product: &Product, cancel: &CancellationToken) -> AdvisorResult<()> {
        let previous = cancellable(cancel, self.inner.get_by_id(product.id)).await?;

        check_not_cancelled(cancel)?;
        if !self.inner.update(product).await? {
            return Err(AdvisorError::ProductNotFound(product.id));
        }

        let mut keys = CacheKey::invalidation_set(product);
        if let Some(previous) = previous.filter(|p| p.product_type != product.product_type) {
            keys.push(CacheKey::ProductType(previous.product_type));
        }
        self.cache.invalidate(&keys).await;

        info!("상품 수정: {} ({})", product.name, product.id);
        Ok(())
    }

    /// 상품 삭제 후 관련 키 무효화
    pub async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> AdvisorResult<()> {
        let existing = cancellable(cancel, self.inner.get_by_id(id)).await?;

        check_not_cancelled(cancel)?;
        if !self.inner.delete(id).await? {
            return Err(AdvisorError::ProductNotFound(id));
        }

        let keys = match &existing {
            Some(product) => CacheKey::invalidation_set(product),
            None => CacheKey::invalidation_set_for_unknown(id),
        };
        self.cache.invalidate(&keys).await;

        info!("상품 삭제: {}", id);
        Ok(())
    }

    /// 상품 id 기준 무효화
    ///
    /// 캐시나 원본에서 상품을 찾으면 해당 유형 키만, 찾지 못하면 모든 유형 키를 지움
    pub async fn invalidate(&self, id: Uuid, cancel: &CancellationToken) {
        let key = CacheKey::ProductId(id).as_key();
        let known = match self.cache.get::<Product>(&key, cancel).await {
            Some(product) => Some(product),
            None => cancellable(cancel, self.inner.get_by_id(id)).await.ok().flatten(),
        };

        let keys = match &known {
            Some(product) => CacheKey::invalidation_set(product),
            None => CacheKey::invalidation_set_for_unknown(id),
        };

        debug!("상품 {} 캐시 무효화 ({} 키)", id, keys.len());
        self.cache.invalidate(&keys).await;
    }
}
