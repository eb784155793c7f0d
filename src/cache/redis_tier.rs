//! Redis 공유 캐시 계층
//!
//! 연결과 각 명령에 시간 제한을 두고, 장애가 나면 일정 시간 동안 계층을 건너뜁니다.
//! 모든 오류는 호출자에게 `CacheError`로 전달되어 캐시 미스로 처리됩니다.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{info, warn};
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisResult};
use tokio::time::timeout;

use super::shared::{CacheError, SharedCacheClient};

/// Redis 공유 캐시 설정
#[derive(Debug, Clone)]
pub struct RedisTierConfig {
    pub redis_url: String,
    pub connect_timeout: Duration,
    pub op_timeout: Duration,
    pub retry_after: Duration,
}

/// Redis 공유 캐시 클라이언트
pub struct RedisSharedCache {
    client: Client,
    connection: tokio::sync::Mutex<Option<MultiplexedConnection>>,
    config: RedisTierConfig,
    /// 장애 이후 다시 시도할 시각
    offline_until: Mutex<Option<Instant>>,
}

impl RedisSharedCache {
    /// 클라이언트 생성. 연결은 첫 사용 시 맺음
    pub fn new(config: RedisTierConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.redis_url.as_str())
            .map_err(|e| CacheError::LayerError(format!("잘못된 Redis 주소 {}: {}", config.redis_url, e)))?;

        info!("Redis 공유 캐시 준비됨: {}", config.redis_url);

        Ok(Self {
            client,
            connection: tokio::sync::Mutex::new(None),
            config,
            offline_until: Mutex::new(None),
        })
    }

    fn ensure_online(&self) -> Result<(), CacheError> {
        let mut offline_until = self.offline_until.lock();
        match *offline_until {
            Some(until) if until > Instant::now() => {
                Err(CacheError::Unavailable(format!("{} (재시도 대기 중)", self.config.redis_url)))
            }
            Some(_) => {
                *offline_until = None;
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn mark_offline(&self) {
        *self.offline_until.lock() = Some(Instant::now() + self.config.retry_after);
        // 다음 시도에서 새로 연결
        self.connection.lock().await.take();
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = match timeout(self.config.connect_timeout, self.client.get_multiplexed_tokio_connection()).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(CacheError::Unavailable(e.to_string())),
            Err(_) => return Err(CacheError::Timeout(format!("connect {}", self.config.redis_url))),
        };

        info!("Redis 연결 완료: {}", self.config.redis_url);
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// 시간 제한과 장애 처리를 적용해 명령 실행
    async fn run<T, F, Fut>(&self, op: &str, command: F) -> Result<T, CacheError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        self.ensure_online()?;

        let conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis 연결 실패, {:?} 동안 공유 계층 건너뜀: {}", self.config.retry_after, e);
                self.mark_offline().await;
                return Err(e);
            }
        };

        match timeout(self.config.op_timeout, command(conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.mark_offline().await;
                Err(CacheError::LayerError(format!("{}: {}", op, e)))
            }
            Err(_) => {
                self.mark_offline().await;
                Err(CacheError::Timeout(op.to_string()))
            }
        }
    }
}

#[async_trait]
impl SharedCacheClient for RedisSharedCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.run("GET", |mut conn| async move {
            redis::cmd("GET").arg(key).query_async::<_, Option<String>>(&mut conn).await
        })
        .await
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), CacheError> {
        let seconds = ttl.as_secs().max(1);
        self.run("SET", |mut conn| async move {
            redis::cmd("SET")
                .arg(key)
                .arg(payload)
                .arg("EX")
                .arg(seconds)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.run("DEL", |mut conn| async move {
            redis::cmd("DEL").arg(key).query_async::<_, ()>(&mut conn).await
        })
        .await
    }
}
