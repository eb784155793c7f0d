//! 실행 설정
//!
//! 기본값 위에 `.env` 파일과 환경 변수를 덮어씁니다.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

/// 엔진 전체 설정
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// 공유 캐시(Redis) 주소. 없으면 프로세스 내부 공유 계층 사용
    pub redis_url: Option<String>,
    /// 상품 카탈로그 SQLite 주소. 없으면 메모리 저장소 사용
    pub database_url: Option<String>,
    pub fast_ttl: Duration,
    pub shared_ttl: Duration,
    /// 단건 조회(`id`)와 전체 목록(`all`) 키의 TTL
    pub product_ttl: Duration,
    pub shared_connect_timeout: Duration,
    pub shared_op_timeout: Duration,
    /// 공유 계층 장애 후 다시 시도하기까지 건너뛰는 시간
    pub shared_retry_after: Duration,
    pub telemetry_recent_capacity: usize,
    pub telemetry_max_endpoints: usize,
    pub telemetry_top_errors: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            database_url: None,
            fast_ttl: Duration::from_secs(300),      // 5분
            shared_ttl: Duration::from_secs(600),    // 10분
            product_ttl: Duration::from_secs(1800),  // 30분
            shared_connect_timeout: Duration::from_millis(3000),
            shared_op_timeout: Duration::from_millis(3000),
            shared_retry_after: Duration::from_millis(5000),
            telemetry_recent_capacity: 1000,
            telemetry_max_endpoints: 512,
            telemetry_top_errors: 10,
        }
    }
}

impl AdvisorConfig {
    /// `.env`와 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        // .env 파일은 선택 사항
        let _ = dotenv::dotenv();

        let mut config = Self::default();

        config.redis_url = non_empty_var("XINVEST_REDIS_URL");
        config.database_url = non_empty_var("XINVEST_DATABASE_URL");

        if let Some(secs) = parse_var::<u64>("XINVEST_FAST_TTL_SECS") {
            config.fast_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("XINVEST_SHARED_TTL_SECS") {
            config.shared_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("XINVEST_PRODUCT_TTL_SECS") {
            config.product_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>("XINVEST_SHARED_CONNECT_TIMEOUT_MS") {
            config.shared_connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>("XINVEST_SHARED_OP_TIMEOUT_MS") {
            config.shared_op_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>("XINVEST_SHARED_RETRY_AFTER_MS") {
            config.shared_retry_after = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var::<usize>("XINVEST_TELEMETRY_RECENT") {
            config.telemetry_recent_capacity = n.max(1);
        }
        if let Some(n) = parse_var::<usize>("XINVEST_TELEMETRY_MAX_ENDPOINTS") {
            config.telemetry_max_endpoints = n.max(1);
        }
        if let Some(n) = parse_var::<usize>("XINVEST_TELEMETRY_TOP_ERRORS") {
            config.telemetry_top_errors = n;
        }

        config
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = non_empty_var(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("환경 변수 {} 값이 올바르지 않아 기본값 사용: {}", name, raw);
            None
        }
    }
}
