//! 도메인 모델
//!
//! 위험 성향 점수, 추천, 캐시가 공유하는 값 타입을 정의합니다.

pub mod model;

pub use model::*;
