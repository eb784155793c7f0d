use std::fmt;

use uuid::Uuid;

use crate::domain::{Classification, Product, ProductCriteria, ProductType};

/// 캐시 키 타입
///
/// 모든 키는 엔티티 필드로부터 결정적으로 만들어지며 패턴 삭제에 의존하지 않음
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    ProductId(Uuid),
    ProductType(ProductType),
    Classification(Classification),
    Criteria(ProductCriteria),
    All,
}

impl CacheKey {
    /// 캐시 키를 문자열로 변환
    pub fn as_key(&self) -> String {
        match self {
            CacheKey::ProductId(id) => format!("product:id:{}", id),
            CacheKey::ProductType(product_type) => format!("product:type:{}", product_type),
            CacheKey::Classification(classification) => {
                format!("products:classification:{}", classification)
            }
            CacheKey::Criteria(criteria) => format!("products:criteria:{}", criteria_segment(criteria)),
            CacheKey::All => "products:all".to_string(),
        }
    }

    /// 상품 변경 후 지워야 할 키 목록
    ///
    /// 조건 검색(`criteria`) 키는 포함하지 않음. TTL 만료로 정리됨
    pub fn invalidation_set(product: &Product) -> Vec<CacheKey> {
        Self::fan_out(product.id, &[product.product_type])
    }

    /// 유형을 알 수 없는 상품 id에 대한 무효화 목록 (모든 유형 키 포함)
    pub fn invalidation_set_for_unknown(id: Uuid) -> Vec<CacheKey> {
        Self::fan_out(id, &ProductType::ALL)
    }

    fn fan_out(id: Uuid, types: &[ProductType]) -> Vec<CacheKey> {
        let mut keys = Vec::with_capacity(2 + types.len() + Classification::ALL.len());
        keys.push(CacheKey::ProductId(id));
        keys.extend(types.iter().copied().map(CacheKey::ProductType));
        keys.extend(Classification::ALL.into_iter().map(CacheKey::Classification));
        keys.push(CacheKey::All);
        keys
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

/// 필터 이름순으로 정렬된 조건 목록. 필터가 없으면 `default`
fn criteria_segment(criteria: &ProductCriteria) -> String {
    let mut parts = Vec::new();

    if let Some(liquid) = criteria.allows_early_withdrawal {
        parts.push(format!("liq={}", liquid));
    }
    if let Some(max) = criteria.max_min_investment {
        parts.push(format!("min={}", max));
    }
    if let Some(risk) = criteria.risk_level {
        parts.push(format!("risk={}", risk));
    }

    if parts.is_empty() {
        return "default".to_string();
    }
    parts.sort();
    parts.join("|")
}
