use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::join_all;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tokio_util::sync::CancellationToken;

use super::keys::CacheKey;
use super::shared::{CacheError, SharedCacheClient};
use crate::config::AdvisorConfig;
use crate::error::AdvisorResult;
use crate::util::cancellable;

/// 2계층 캐시 (Fast: 프로세스 내부, Shared: 네트워크)
///
/// 읽기 경로:
/// 1. Fast 계층 확인
/// 2. Shared 계층 확인 (히트 시 Fast 계층 재적재)
/// 3. 둘 다 미스면 원본 조회 후 두 계층에 적재
///
/// 계층 장애는 호출자에게 전달되지 않고 미스로 처리됨
pub struct TieredCache {
    fast: DashMap<String, FastEntry>,
    shared: Option<Arc<dyn SharedCacheClient>>,
    settings: TierSettings,
    metrics: Arc<CacheMetrics>,
}

/// 계층별 TTL 및 공유 계층 시간 제한
#[derive(Debug, Clone)]
pub struct TierSettings {
    pub fast_ttl: Duration,
    pub shared_ttl: Duration,
    pub shared_op_timeout: Duration,
}

impl From<&AdvisorConfig> for TierSettings {
    fn from(config: &AdvisorConfig) -> Self {
        Self {
            fast_ttl: config.fast_ttl,
            shared_ttl: config.shared_ttl,
            shared_op_timeout: config.shared_op_timeout,
        }
    }
}

impl Default for TierSettings {
    fn default() -> Self {
        Self::from(&AdvisorConfig::default())
    }
}

/// Fast 계층 엔트리
#[derive(Debug, Clone)]
struct FastEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

impl FastEntry {
    fn new(value: serde_json::Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// 캐시 성능 메트릭
#[derive(Debug)]
pub struct CacheMetrics {
    pub fast_hits: AtomicU64,
    pub fast_misses: AtomicU64,
    pub shared_hits: AtomicU64,
    pub shared_misses: AtomicU64,
    /// 원본 저장소까지 내려간 조회 수
    pub source_loads: AtomicU64,
    /// 공유 계층 실패, 직렬화 실패 등
    pub tier_errors: AtomicU64,
    pub invalidated_keys: AtomicU64,
    pub start_time: Instant,
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self {
            fast_hits: AtomicU64::new(0),
            fast_misses: AtomicU64::new(0),
            shared_hits: AtomicU64::new(0),
            shared_misses: AtomicU64::new(0),
            source_loads: AtomicU64::new(0),
            tier_errors: AtomicU64::new(0),
            invalidated_keys: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fast_hit_rate(&self) -> f64 {
        rate(self.fast_hits.load(Ordering::Relaxed), self.fast_misses.load(Ordering::Relaxed))
    }

    /// 원본 조회 없이 응답한 비율 (%)
    pub fn overall_hit_rate(&self) -> f64 {
        let hits = self.fast_hits.load(Ordering::Relaxed) + self.shared_hits.load(Ordering::Relaxed);
        rate(hits, self.source_loads.load(Ordering::Relaxed))
    }

    pub fn print_stats(&self) {
        info!("📊 캐시 통계 (가동 {:?})", self.start_time.elapsed());
        info!("   Fast 히트/미스: {}/{}", self.fast_hits.load(Ordering::Relaxed), self.fast_misses.load(Ordering::Relaxed));
        info!("   Shared 히트/미스: {}/{}", self.shared_hits.load(Ordering::Relaxed), self.shared_misses.load(Ordering::Relaxed));
        info!("   원본 조회: {}", self.source_loads.load(Ordering::Relaxed));
        info!("   계층 오류: {}", self.tier_errors.load(Ordering::Relaxed));
        info!("   무효화된 키: {}", self.invalidated_keys.load(Ordering::Relaxed));
        info!("   Fast 히트율: {:.2}%", self.fast_hit_rate());
        info!("   전체 히트율: {:.2}%", self.overall_hit_rate());
    }
}

fn rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total > 0 {
        hits as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// 캐시 상태 정보
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub fast_entries: usize,
    /// 공유 계층 이름 (없으면 Fast 계층 단독)
    pub shared_tier: Option<&'static str>,
}

impl TieredCache {
    pub fn new(settings: TierSettings) -> Self {
        Self {
            fast: DashMap::new(),
            shared: None,
            settings,
            metrics: Arc::new(CacheMetrics::new()),
        }
    }

    /// 공유 계층 설정
    pub fn with_shared(mut self, shared: Arc<dyn SharedCacheClient>) -> Self {
        info!("공유 캐시 계층 연결: {}", shared.name());
        self.shared = Some(shared);
        self
    }

    pub fn settings(&self) -> &TierSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            fast_entries: self.fast.len(),
            shared_tier: self.shared.as_ref().map(|s| s.name()),
        }
    }

    /// 두 계층에서 값 조회. 원본은 조회하지 않음
    pub async fn get<T>(&self, key: &str, cancel: &CancellationToken) -> Option<T>
    where
        T: DeserializeOwned,
    {
        if let Some(value) = self.get_fast(key) {
            CacheMetrics::bump(&self.metrics.fast_hits);
            return Some(value);
        }
        CacheMetrics::bump(&self.metrics.fast_misses);

        let payload = self.get_shared(key, cancel).await?;
        match serde_json::from_str::<serde_json::Value>(&payload) {
            Ok(json) => match serde_json::from_value::<T>(json.clone()) {
                Ok(value) => {
                    // 남은 Shared TTL을 알 수 없으므로 Fast TTL로 재적재
                    self.fast.insert(key.to_string(), FastEntry::new(json, self.settings.fast_ttl));
                    Some(value)
                }
                Err(e) => {
                    self.record_tier_error(key, "shared", &CacheError::from(e));
                    None
                }
            },
            Err(e) => {
                self.record_tier_error(key, "shared", &CacheError::from(e));
                None
            }
        }
    }

    /// 두 계층에 값 저장 (best-effort)
    ///
    /// Fast 계층 TTL은 `min(ttl, fast_ttl)`, Shared 계층 TTL은 `ttl`
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration, cancel: &CancellationToken)
    where
        T: Serialize,
    {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                self.record_tier_error(key, "fast", &CacheError::from(e));
                return;
            }
        };

        let payload = json.to_string();
        self.fast
            .insert(key.to_string(), FastEntry::new(json, ttl.min(self.settings.fast_ttl)));

        if let Some(shared) = &self.shared {
            let result = self
                .shared_call(cancel, shared.set(key, &payload, ttl))
                .await;
            if let Err(e) = result {
                self.record_tier_error(key, shared.name(), &e);
            }
        }

        debug!("캐시 저장됨: {} (ttl {:?})", key, ttl);
    }

    /// cache-aside 조회
    ///
    /// 두 계층 모두 미스일 때만 `loader`를 호출하고 결과를 적재함.
    /// `loader` 오류는 그대로 전달되며 아무것도 캐시하지 않음
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        cancel: &CancellationToken,
        loader: F,
    ) -> AdvisorResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AdvisorResult<T>>,
    {
        if let Some(value) = self.get::<T>(key, cancel).await {
            return Ok(value);
        }

        CacheMetrics::bump(&self.metrics.source_loads);
        let value = cancellable(cancel, loader()).await?;

        self.set(key, &value, ttl, cancel).await;
        Ok(value)
    }

    /// 키 무효화
    ///
    /// Fast 계층은 즉시 제거하고, Shared 계층 삭제는 동시에 실행함.
    /// 실패는 기록만 하고 재시도하지 않음
    pub async fn invalidate(&self, keys: &[CacheKey]) {
        let keys: Vec<String> = keys.iter().map(CacheKey::as_key).collect();

        for key in &keys {
            self.fast.remove(key);
        }
        self.metrics
            .invalidated_keys
            .fetch_add(keys.len() as u64, Ordering::Relaxed);

        let Some(shared) = &self.shared else {
            debug!("캐시 무효화됨 (Fast 계층): {} 키", keys.len());
            return;
        };

        // 무효화는 쓰기 요청의 취소와 무관하게 끝까지 진행
        let never = CancellationToken::new();
        let removals = keys.iter().map(|key| {
            let never = &never;
            async move { (key, self.shared_call(never, shared.remove(key)).await) }
        });

        for (key, result) in join_all(removals).await {
            if let Err(e) = result {
                self.record_tier_error(key, shared.name(), &e);
            }
        }

        debug!("캐시 무효화됨: {} 키", keys.len());
    }

    /// 만료된 Fast 엔트리 정리 작업 시작
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("캐시 정리 작업 중지됨");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            debug!("만료된 Fast 엔트리 {}개 정리", removed);
                        }
                    }
                }
            }
        })
    }

    /// 만료된 Fast 엔트리 제거. 제거한 개수 반환
    pub fn purge_expired(&self) -> usize {
        let before = self.fast.len();
        self.fast.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.fast.len())
    }

    /// Fast 계층에 유효한 엔트리가 있는지 (메트릭에 반영되지 않음)
    pub fn contains_fast(&self, key: &str) -> bool {
        self.fast.get(key).map_or(false, |entry| !entry.is_expired())
    }

    fn get_fast<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        // 샤드 잠금을 놓은 뒤에 제거해야 함
        let live = self
            .fast
            .get(key)
            .map(|entry| (!entry.is_expired()).then(|| entry.value.clone()));

        let value = match live {
            Some(Some(value)) => value,
            Some(None) => {
                self.fast.remove_if(key, |_, entry| entry.is_expired());
                return None;
            }
            None => return None,
        };

        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                self.fast.remove(key);
                self.record_tier_error(key, "fast", &CacheError::from(e));
                None
            }
        }
    }

    async fn get_shared(&self, key: &str, cancel: &CancellationToken) -> Option<String> {
        let shared = self.shared.as_ref()?;

        match self.shared_call(cancel, shared.get(key)).await {
            Ok(Some(payload)) => {
                CacheMetrics::bump(&self.metrics.shared_hits);
                Some(payload)
            }
            Ok(None) => {
                CacheMetrics::bump(&self.metrics.shared_misses);
                None
            }
            Err(e) => {
                CacheMetrics::bump(&self.metrics.shared_misses);
                self.record_tier_error(key, shared.name(), &e);
                None
            }
        }
    }

    /// 공유 계층 호출에 시간 제한과 취소를 적용
    async fn shared_call<R, Fut>(&self, cancel: &CancellationToken, call: Fut) -> Result<R, CacheError>
    where
        Fut: Future<Output = Result<R, CacheError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CacheError::LayerError("요청 취소됨".to_string())),
            result = timeout(self.settings.shared_op_timeout, call) => match result {
                Ok(inner) => inner,
                Err(_) => Err(CacheError::Timeout(format!("{:?}", self.settings.shared_op_timeout))),
            },
        }
    }

    fn record_tier_error(&self, key: &str, tier: &str, error: &CacheError) {
        CacheMetrics::bump(&self.metrics.tier_errors);
        warn!("캐시 계층 오류 (tier={}, key={}): {}", tier, key, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::cache::shared::InMemorySharedCache;
    use crate::error::AdvisorError;

    fn settings() -> TierSettings {
        TierSettings {
            fast_ttl: Duration::from_secs(60),
            shared_ttl: Duration::from_secs(120),
            shared_op_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_fast_tier_ttl_is_capped() {
        let cache = TieredCache::new(TierSettings {
            fast_ttl: Duration::from_millis(20),
            ..settings()
        });
        let cancel = CancellationToken::new();

        cache.set("k", &42u32, Duration::from_secs(600), &cancel).await;
        assert_eq!(cache.get::<u32>("k", &cancel).await, Some(42));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get::<u32>("k", &cancel).await, None);
    }

    #[tokio::test]
    async fn test_shared_hit_repopulates_fast_tier() {
        let shared = Arc::new(InMemorySharedCache::new());
        let writer = TieredCache::new(settings()).with_shared(shared.clone());
        let reader = TieredCache::new(settings()).with_shared(shared.clone());
        let cancel = CancellationToken::new();

        writer.set("products:all", &vec![1, 2, 3], Duration::from_secs(60), &cancel).await;

        assert!(!reader.contains_fast("products:all"));
        assert_eq!(reader.get::<Vec<i32>>("products:all", &cancel).await, Some(vec![1, 2, 3]));
        assert!(reader.contains_fast("products:all"));
        assert_eq!(reader.metrics().shared_hits.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_loader_error_is_not_cached() {
        let cache = TieredCache::new(settings());
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let result: AdvisorResult<u32> = cache
            .get_or_fetch("k", Duration::from_secs(60), &cancel, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AdvisorError::NoProductForType("cdb".to_string()))
            })
            .await;
        assert!(result.is_err());

        let value = cache
            .get_or_fetch("k", Duration::from_secs(60), &cancel, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(5u32)
            })
            .await
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_corrupt_shared_payload_is_a_miss() {
        let shared = Arc::new(InMemorySharedCache::new());
        shared.set("k", "{not json", Duration::from_secs(60)).await.unwrap();
        let cache = TieredCache::new(settings()).with_shared(shared);
        let cancel = CancellationToken::new();

        let value = cache
            .get_or_fetch("k", Duration::from_secs(60), &cancel, || async { Ok(9u32) })
            .await
            .unwrap();

        assert_eq!(value, 9);
        assert_eq!(cache.metrics().tier_errors.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_cancelled_loader() {
        let cache = TieredCache::new(settings());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = cache
            .get_or_fetch("k", Duration::from_secs(60), &cancel, || async { Ok(1u32) })
            .await;

        assert!(matches!(result, Err(AdvisorError::Cancelled)));
        assert!(!cache.contains_fast("k"));
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_cancel() {
        let cache = Arc::new(TieredCache::new(TierSettings {
            fast_ttl: Duration::from_millis(5),
            ..settings()
        }));
        let cancel = CancellationToken::new();
        cache.set("k", &1u8, Duration::from_secs(1), &cancel).await;

        let handle = cache.spawn_sweeper(Duration::from_millis(10), cancel.clone());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.status().fast_entries, 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
