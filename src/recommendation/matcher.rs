use std::cmp::Ordering;
use std::sync::Arc;

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::cache::CachedProductCatalog;
use crate::domain::{Classification, Product, ProductType};
use crate::error::{AdvisorError, AdvisorResult};
use crate::telemetry::TelemetryAggregator;

/// 근접도 기반 상품 추천
///
/// 상태가 없으며 카탈로그 조회 외에는 대기하지 않음
pub struct RecommendationMatcher {
    catalog: Arc<CachedProductCatalog>,
    telemetry: Arc<TelemetryAggregator>,
}

impl RecommendationMatcher {
    pub fn new(catalog: Arc<CachedProductCatalog>, telemetry: Arc<TelemetryAggregator>) -> Self {
        Self { catalog, telemetry }
    }

    /// 유형의 상품을 목표 성향에 가까운 순서로 반환. 해당 유형 상품이 없으면 빈 목록
    pub async fn recommend(
        &self,
        product_type: ProductType,
        target: Option<Classification>,
        cancel: &CancellationToken,
    ) -> AdvisorResult<Vec<Product>> {
        let endpoint = format!("GET /products/recommend/{}", product_type);
        self.telemetry
            .timed(&endpoint, async {
                let products = self.catalog.get_by_type(product_type, cancel).await?;
                debug!(
                    "추천 후보 {}개 (유형 {}, 목표 {:?})",
                    products.len(),
                    product_type,
                    target
                );
                Ok::<_, AdvisorError>(rank_products(products, target))
            })
            .await
    }

    /// 문자열 유형으로 추천. 인식할 수 없는 유형은 오류
    pub async fn recommend_named(
        &self,
        product_type: &str,
        target: Option<Classification>,
        cancel: &CancellationToken,
    ) -> AdvisorResult<Vec<Product>> {
        let parsed = match product_type.parse::<ProductType>() {
            Ok(parsed) => parsed,
            Err(_) => {
                let error = AdvisorError::UnknownProductType(product_type.to_string());
                self.telemetry
                    .record_call("GET /products/recommend", 0, false, Some(error.kind()));
                return Err(error);
            }
        };

        self.recommend(parsed, target, cancel).await
    }
}

/// 추천 순서 정렬
///
/// - 목표 있음: 정확히 일치 → 순위 거리 오름차순 → 수익률 내림차순
/// - 목표 없음: 수익률 오름차순
///
/// 모든 키가 같으면 이름, id 순
pub fn rank_products(mut products: Vec<Product>, target: Option<Classification>) -> Vec<Product> {
    match target {
        Some(target) => products.sort_by(|a, b| {
            let exact_a = a.recommended_classification == target;
            let exact_b = b.recommended_classification == target;
            exact_b
                .cmp(&exact_a)
                .then_with(|| {
                    a.recommended_classification
                        .distance(target)
                        .cmp(&b.recommended_classification.distance(target))
                })
                .then_with(|| b.annual_yield.total_cmp(&a.annual_yield))
                .then_with(|| tie_break(a, b))
        }),
        None => products.sort_by(|a, b| a.annual_yield.total_cmp(&b.annual_yield).then_with(|| tie_break(a, b))),
    }
    products
}

fn tie_break(a: &Product, b: &Product) -> Ordering {
    a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
}
