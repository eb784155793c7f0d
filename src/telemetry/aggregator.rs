use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, TimeZone, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::normalize::normalize_endpoint;
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;

/// 엔드포인트 수 상한을 넘은 이름이 모이는 버킷
pub const OVERFLOW_ENDPOINT: &str = "overflow";
/// 실패했지만 오류 종류가 주어지지 않은 호출
pub const UNKNOWN_ERROR_KIND: &str = "unknown";

/// 텔레메트리 오류 분류
pub trait ErrorKind {
    fn error_kind(&self) -> &str;
}

impl ErrorKind for AdvisorError {
    fn error_kind(&self) -> &str {
        self.kind()
    }
}

/// 엔드포인트별 원자 카운터
#[derive(Debug)]
struct EndpointCounters {
    calls: AtomicU64,
    successes: AtomicU64,
    errors: AtomicU64,
    total_ms: AtomicU64,
    min_ms: AtomicU64,
    max_ms: AtomicU64,
    last_updated_ms: AtomicI64,
}

impl EndpointCounters {
    fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_ms: AtomicU64::new(0),
            min_ms: AtomicU64::new(u64::MAX),
            max_ms: AtomicU64::new(0),
            last_updated_ms: AtomicI64::new(0),
        }
    }

    fn record(&self, elapsed_ms: u64, success: bool, now_ms: i64) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.total_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
        self.min_ms.fetch_min(elapsed_ms, Ordering::Relaxed);
        self.max_ms.fetch_max(elapsed_ms, Ordering::Relaxed);
        self.last_updated_ms.fetch_max(now_ms, Ordering::Relaxed);
    }

    fn summary(&self, name: &str) -> EndpointSummary {
        let call_count = self.calls.load(Ordering::Relaxed);
        let error_count = self.errors.load(Ordering::Relaxed);
        let total_ms = self.total_ms.load(Ordering::Relaxed);
        let min_ms = self.min_ms.load(Ordering::Relaxed);

        EndpointSummary {
            name: name.to_string(),
            call_count,
            success_count: self.successes.load(Ordering::Relaxed),
            error_count,
            avg_ms: ratio(total_ms, call_count),
            min_ms: if min_ms == u64::MAX { 0 } else { min_ms },
            max_ms: self.max_ms.load(Ordering::Relaxed),
            total_ms,
            error_rate: ratio(error_count, call_count),
            last_updated: from_millis(self.last_updated_ms.load(Ordering::Relaxed)),
        }
    }
}

/// (엔드포인트, 오류 종류)별 카운터
#[derive(Debug)]
struct ErrorCounters {
    count: AtomicU64,
    first_seen: DateTime<Utc>,
    last_seen_ms: AtomicI64,
}

/// 개별 호출 기록 (진단용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub endpoint: String,
    pub elapsed_ms: u64,
    pub success: bool,
    pub error_kind: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSummary {
    pub name: String,
    pub call_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub avg_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub total_ms: u64,
    /// 0.0..=1.0
    pub error_rate: f64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub endpoint: String,
    pub error_kind: String,
    pub count: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// 구간 집계 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySummary {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub total_calls: u64,
    pub total_errors: u64,
    /// 호출 수 내림차순
    pub endpoints: Vec<EndpointSummary>,
    pub top_errors: Vec<ErrorSummary>,
}

impl TelemetrySummary {
    pub fn endpoint(&self, name: &str) -> Option<&EndpointSummary> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    pub fn print_summary(&self) {
        info!("📈 텔레메트리 요약 ({} ~ {})", self.window_start, self.window_end);
        info!("   총 호출: {}, 오류: {}", self.total_calls, self.total_errors);
        for endpoint in &self.endpoints {
            info!(
                "   {} → {}회, 평균 {:.2}ms (최소 {} / 최대 {}), 오류율 {:.1}%",
                endpoint.name,
                endpoint.call_count,
                endpoint.avg_ms,
                endpoint.min_ms,
                endpoint.max_ms,
                endpoint.error_rate * 100.0
            );
        }
        for error in &self.top_errors {
            info!("   ⚠️  {} [{}] {}회", error.endpoint, error.error_kind, error.count);
        }
    }
}

/// 호출 텔레메트리 집계기
///
/// 프로세스 수명 동안 하나를 만들어 `Arc`로 공유합니다. 기록 경로의 카운터 갱신은
/// 모두 원자 연산이며 최근 호출 버퍼만 짧은 뮤텍스를 사용합니다.
pub struct TelemetryAggregator {
    endpoints: DashMap<String, Arc<EndpointCounters>>,
    errors: DashMap<(String, String), Arc<ErrorCounters>>,
    recent: Mutex<VecDeque<CallRecord>>,
    recent_capacity: usize,
    max_endpoints: usize,
    /// overflow 버킷을 제외한 등록 이름 수. 항상 `max_endpoints` 이하
    named_slots: AtomicUsize,
    top_errors: usize,
    started_at: Instant,
}

impl TelemetryAggregator {
    pub fn new(recent_capacity: usize, max_endpoints: usize, top_errors: usize) -> Self {
        let recent_capacity = recent_capacity.max(1);
        Self {
            endpoints: DashMap::new(),
            errors: DashMap::new(),
            recent: Mutex::new(VecDeque::with_capacity(recent_capacity)),
            recent_capacity,
            max_endpoints: max_endpoints.max(1),
            named_slots: AtomicUsize::new(0),
            top_errors,
            started_at: Instant::now(),
        }
    }

    pub fn from_config(config: &AdvisorConfig) -> Self {
        Self::new(
            config.telemetry_recent_capacity,
            config.telemetry_max_endpoints,
            config.telemetry_top_errors,
        )
    }

    /// 호출 1건 기록. 실패하지 않음
    pub fn record_call(&self, endpoint: &str, elapsed_ms: u64, success: bool, error_kind: Option<&str>) {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();
        let (name, counters) = self.counters_for(normalize_endpoint(endpoint));
        counters.record(elapsed_ms, success, now_ms);

        let error_kind = (!success).then(|| error_kind.unwrap_or(UNKNOWN_ERROR_KIND).to_string());
        if let Some(kind) = &error_kind {
            let record = self
                .errors
                .entry((name.clone(), kind.clone()))
                .or_insert_with(|| {
                    Arc::new(ErrorCounters {
                        count: AtomicU64::new(0),
                        first_seen: now,
                        last_seen_ms: AtomicI64::new(now_ms),
                    })
                })
                .clone();
            record.count.fetch_add(1, Ordering::Relaxed);
            record.last_seen_ms.fetch_max(now_ms, Ordering::Relaxed);
        }

        let mut recent = self.recent.lock();
        if recent.len() >= self.recent_capacity {
            recent.pop_front();
        }
        recent.push_back(CallRecord {
            endpoint: name,
            elapsed_ms,
            success,
            error_kind,
            recorded_at: now,
        });
    }

    /// 비동기 작업 실행 시간을 측정해 기록
    pub async fn timed<T, E, F>(&self, endpoint: &str, fut: F) -> Result<T, E>
    where
        E: ErrorKind,
        F: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let result = fut.await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => self.record_call(endpoint, elapsed_ms, true, None),
            Err(e) => self.record_call(endpoint, elapsed_ms, false, Some(e.error_kind())),
        }
        result
    }

    /// 구간 내에 마지막 활동이 있는 엔드포인트와 오류의 집계
    pub fn snapshot(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> TelemetrySummary {
        let in_window = |at: DateTime<Utc>| at >= window_start && at <= window_end;

        let mut endpoints: Vec<EndpointSummary> = self
            .endpoints
            .iter()
            .map(|entry| entry.value().summary(entry.key()))
            .filter(|summary| summary.call_count > 0 && in_window(summary.last_updated))
            .collect();
        endpoints.sort_by(|a, b| b.call_count.cmp(&a.call_count).then_with(|| a.name.cmp(&b.name)));

        let mut errors: Vec<ErrorSummary> = self
            .errors
            .iter()
            .map(|entry| {
                let (endpoint, error_kind) = entry.key();
                let counters = entry.value();
                ErrorSummary {
                    endpoint: endpoint.clone(),
                    error_kind: error_kind.clone(),
                    count: counters.count.load(Ordering::Relaxed),
                    first_seen: counters.first_seen,
                    last_seen: from_millis(counters.last_seen_ms.load(Ordering::Relaxed)),
                }
            })
            .filter(|error| in_window(error.last_seen))
            .collect();
        errors.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
                .then_with(|| a.error_kind.cmp(&b.error_kind))
        });
        errors.truncate(self.top_errors);

        TelemetrySummary {
            window_start,
            window_end,
            generated_at: Utc::now(),
            total_calls: endpoints.iter().map(|e| e.call_count).sum(),
            total_errors: endpoints.iter().map(|e| e.error_count).sum(),
            endpoints,
            top_errors: errors,
        }
    }

    /// 최근 호출 기록 (오래된 순)
    pub fn recent_calls(&self) -> Vec<CallRecord> {
        self.recent.lock().iter().cloned().collect()
    }

    pub fn recent_capacity(&self) -> usize {
        self.recent_capacity
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// 이름의 카운터. 상한을 넘은 새 이름은 overflow 버킷으로
    ///
    /// 새 이름은 슬롯을 먼저 예약한 뒤에만 등록되므로 동시에 처음 들어온 이름들도
    /// 상한을 넘지 않음
    fn counters_for(&self, name: String) -> (String, Arc<EndpointCounters>) {
        if let Some(counters) = self.endpoints.get(&name) {
            return (name, counters.value().clone());
        }

        match self.endpoints.entry(name) {
            Entry::Occupied(entry) => (entry.key().clone(), entry.get().clone()),
            Entry::Vacant(entry) if self.reserve_slot() => {
                let name = entry.key().clone();
                let counters = entry.insert(Arc::new(EndpointCounters::new())).value().clone();
                (name, counters)
            }
            Entry::Vacant(entry) => {
                // 같은 샤드일 수 있으므로 잠금을 먼저 해제
                drop(entry);
                let counters = self
                    .endpoints
                    .entry(OVERFLOW_ENDPOINT.to_string())
                    .or_insert_with(|| Arc::new(EndpointCounters::new()))
                    .clone();
                (OVERFLOW_ENDPOINT.to_string(), counters)
            }
        }
    }

    fn reserve_slot(&self) -> bool {
        self.named_slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < self.max_endpoints).then_some(n + 1))
            .is_ok()
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}
