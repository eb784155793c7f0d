use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

/// 캐시 계층 오류
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("공유 캐시 사용 불가: {0}")]
    Unavailable(String),
    #[error("공유 캐시 시간 초과: {0}")]
    Timeout(String),
    #[error("캐시 레이어 오류: {0}")]
    LayerError(String),
    #[error("직렬화 오류: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 공유(네트워크) 캐시 계층
///
/// 문자열 키와 직렬화된 페이로드를 TTL과 함께 저장함. 구현체는 장애 시 오류를 반환하고
/// 호출자(`TieredCache`)가 이를 미스로 처리함
#[async_trait]
pub trait SharedCacheClient: Send + Sync {
    fn name(&self) -> &'static str;
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// 프로세스 내부 공유 계층
///
/// Redis가 없는 개발 환경과 테스트용. `set_available(false)`로 장애를 흉내낼 수 있음
#[derive(Default)]
pub struct InMemorySharedCache {
    data: Mutex<HashMap<String, (String, Instant)>>,
    unavailable: AtomicBool,
}

impl InMemorySharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// 만료되지 않은 키 존재 여부 (장애 여부와 무관)
    pub fn contains(&self, key: &str) -> bool {
        self.data
            .lock()
            .get(key)
            .map_or(false, |(_, expires_at)| *expires_at > Instant::now())
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("in-memory shared tier offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SharedCacheClient for InMemorySharedCache {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check()?;
        let mut data = self.data.lock();
        match data.get(key) {
            Some((payload, expires_at)) if *expires_at > Instant::now() => Ok(Some(payload.clone())),
            Some(_) => {
                data.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.data
            .lock()
            .insert(key.to_string(), (payload.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.check()?;
        self.data.lock().remove(key);
        Ok(())
    }
}
