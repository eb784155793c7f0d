use thiserror::Error;
use uuid::Uuid;

use crate::domain::ClientId;

/// 외부 저장소(협력 객체) 오류
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),

    #[error("저장된 레코드 변환 실패: {0}")]
    Corrupt(String),

    #[error("저장소 오류: {0}")]
    Backend(String),
}

/// 호출자에게 노출되는 오류
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("고객 {0}을(를) 찾을 수 없음")]
    ClientNotFound(ClientId),

    #[error("상품 {0}을(를) 찾을 수 없음")]
    ProductNotFound(Uuid),

    #[error("알 수 없는 상품 유형: {0}")]
    UnknownProductType(String),

    #[error("상품 유형 {0}에 해당하는 상품이 없음")]
    NoProductForType(String),

    #[error("최소 투자금 미달: 최소 {minimum:.2}, 요청 {requested:.2}")]
    BelowMinimumInvestment { minimum: f64, requested: f64 },

    #[error("요청이 취소됨")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdvisorError {
    /// 텔레메트리 오류 분류용 짧은 이름
    pub fn kind(&self) -> &'static str {
        match self {
            AdvisorError::ClientNotFound(_) => "client_not_found",
            AdvisorError::ProductNotFound(_) => "product_not_found",
            AdvisorError::UnknownProductType(_) => "unknown_product_type",
            AdvisorError::NoProductForType(_) => "no_product_for_type",
            AdvisorError::BelowMinimumInvestment { .. } => "below_minimum_investment",
            AdvisorError::Cancelled => "cancelled",
            AdvisorError::Store(_) => "store_error",
        }
    }
}

pub type AdvisorResult<T> = Result<T, AdvisorError>;
