//! xinvest: 고객 위험 성향 분류, 상품 추천, 카탈로그 2계층 캐시, 호출 텔레메트리

pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod recommendation;
pub mod risk;
pub mod simulation;
pub mod telemetry;
pub mod util;

pub use config::AdvisorConfig;
pub use engine::AdvisorEngine;
pub use error::{AdvisorError, AdvisorResult, StoreError};
