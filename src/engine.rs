//! 구성 요소 조립
//!
//! 설정에 따라 카탈로그 저장소와 공유 캐시 계층을 고르고, 모든 서비스가 같은
//! 캐시와 텔레메트리 인스턴스를 공유하도록 연결합니다.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::{
    CachedProductCatalog, InMemorySharedCache, RedisSharedCache, RedisTierConfig, SharedCacheClient, TierSettings,
    TieredCache,
};
use crate::config::AdvisorConfig;
use crate::db::{init_database, InMemoryClientStore, InMemoryProductStore, ProductCatalogStore, SqliteProductStore};
use crate::error::{AdvisorResult, StoreError};
use crate::recommendation::RecommendationMatcher;
use crate::risk::RiskProfileService;
use crate::simulation::SimulationService;
use crate::telemetry::TelemetryAggregator;

/// 만료 엔트리 정리 주기
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// 조립된 엔진
pub struct AdvisorEngine {
    pub clients: Arc<InMemoryClientStore>,
    pub catalog: Arc<CachedProductCatalog>,
    pub risk: Arc<RiskProfileService>,
    pub matcher: Arc<RecommendationMatcher>,
    pub simulation: Arc<SimulationService>,
    pub telemetry: Arc<TelemetryAggregator>,
    shutdown: CancellationToken,
    sweeper: Option<JoinHandle<()>>,
}

impl AdvisorEngine {
    /// 설정대로 조립. 카탈로그 DB 연결 실패만 오류로 반환
    pub async fn build(config: &AdvisorConfig) -> AdvisorResult<Self> {
        let store: Arc<dyn ProductCatalogStore> = match &config.database_url {
            Some(url) => {
                let pool = init_database(url, 5).await.map_err(StoreError::from)?;
                Arc::new(SqliteProductStore::new(pool))
            }
            None => {
                info!("카탈로그 DB 주소가 없어 메모리 저장소 사용");
                Arc::new(InMemoryProductStore::new())
            }
        };

        Ok(Self::assemble(config, store, Self::shared_tier(config), Arc::new(InMemoryClientStore::new())))
    }

    /// 주어진 저장소와 공유 계층으로 조립 (테스트용 주입 지점)
    pub fn assemble(
        config: &AdvisorConfig,
        store: Arc<dyn ProductCatalogStore>,
        shared: Arc<dyn SharedCacheClient>,
        clients: Arc<InMemoryClientStore>,
    ) -> Self {
        let telemetry = Arc::new(TelemetryAggregator::from_config(config));
        let cache = Arc::new(TieredCache::new(TierSettings::from(config)).with_shared(shared));
        let catalog = Arc::new(CachedProductCatalog::new(store, cache.clone(), config.product_ttl));

        let risk = Arc::new(RiskProfileService::new(
            clients.clone(),
            clients.clone(),
            clients.clone(),
            telemetry.clone(),
        ));
        let matcher = Arc::new(RecommendationMatcher::new(catalog.clone(), telemetry.clone()));
        let simulation = Arc::new(SimulationService::new(
            clients.clone(),
            clients.clone(),
            matcher.clone(),
            risk.clone(),
            telemetry.clone(),
        ));

        let shutdown = CancellationToken::new();
        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(_) => Some(cache.spawn_sweeper(SWEEP_INTERVAL, shutdown.child_token())),
            Err(_) => None,
        };

        Self {
            clients,
            catalog,
            risk,
            matcher,
            simulation,
            telemetry,
            shutdown,
            sweeper,
        }
    }

    /// Redis 주소가 있으면 Redis, 없거나 잘못되면 프로세스 내부 계층
    fn shared_tier(config: &AdvisorConfig) -> Arc<dyn SharedCacheClient> {
        let Some(url) = &config.redis_url else {
            info!("Redis 주소가 없어 프로세스 내부 공유 계층 사용");
            return Arc::new(InMemorySharedCache::new());
        };

        let redis_config = RedisTierConfig {
            redis_url: url.clone(),
            connect_timeout: config.shared_connect_timeout,
            op_timeout: config.shared_op_timeout,
            retry_after: config.shared_retry_after,
        };
        match RedisSharedCache::new(redis_config) {
            Ok(redis) => Arc::new(redis),
            Err(e) => {
                warn!("Redis 계층 생성 실패, 프로세스 내부 계층으로 대체: {}", e);
                Arc::new(InMemorySharedCache::new())
            }
        }
    }

    /// 백그라운드 작업 중지
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(sweeper) = self.sweeper.take() {
            let _ = sweeper.await;
        }
        info!("엔진 종료");
    }
}
