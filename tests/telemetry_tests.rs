//! 텔레메트리 집계 통합 테스트

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;

use xinvest::cache::InMemorySharedCache;
use xinvest::db::{InMemoryClientStore, InMemoryProductStore};
use xinvest::telemetry::{TelemetryAggregator, OVERFLOW_ENDPOINT, UNKNOWN_ENDPOINT, UNKNOWN_ERROR_KIND};
use xinvest::{AdvisorConfig, AdvisorEngine};

fn whole_window(telemetry: &TelemetryAggregator) -> xinvest::telemetry::TelemetrySummary {
    telemetry.snapshot(Utc::now() - Duration::hours(1), Utc::now() + Duration::hours(1))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_recording_loses_nothing() {
    let telemetry = Arc::new(TelemetryAggregator::new(64, 32, 10));
    let tasks = 16;
    let per_task = 500;

    let handles: Vec<_> = (0..tasks)
        .map(|task| {
            let telemetry = telemetry.clone();
            tokio::spawn(async move {
                for i in 0..per_task {
                    let endpoint = format!("GET /clients/{}/risk-profile", task * per_task + i);
                    let success = i % 5 != 0;
                    let kind = (!success).then_some("timeout");
                    telemetry.record_call(&endpoint, (i % 50) as u64 + 1, success, kind);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let summary = whole_window(&telemetry);
    let endpoint = summary.endpoint("GET /clients/{n}/risk-profile").unwrap();

    let expected = (tasks * per_task) as u64;
    assert_eq!(endpoint.call_count, expected);
    assert_eq!(endpoint.error_count, expected / 5);
    assert_eq!(endpoint.success_count + endpoint.error_count, endpoint.call_count);
    assert_eq!(endpoint.min_ms, 1);
    assert_eq!(endpoint.max_ms, 50);
    assert_eq!(summary.total_calls, expected);

    assert_eq!(summary.top_errors.len(), 1);
    assert_eq!(summary.top_errors[0].count, expected / 5);
    assert_eq!(telemetry.recent_calls().len(), 64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_recent_buffer_stays_bounded_under_burst() {
    let telemetry = Arc::new(TelemetryAggregator::new(10, 8, 5));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let telemetry = telemetry.clone();
            tokio::spawn(async move {
                for _ in 0..1_000 {
                    telemetry.record_call("POST /simulations", 3, true, None);
                    assert!(telemetry.recent_calls().len() <= 10);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(telemetry.recent_calls().len(), telemetry.recent_capacity());
}

#[test]
fn test_malformed_and_excess_names_are_bucketed() {
    let telemetry = TelemetryAggregator::new(16, 3, 10);

    telemetry.record_call("", 1, true, None);
    telemetry.record_call("GET /a b", 1, false, None);
    telemetry.record_call("GET /one", 1, true, None);
    telemetry.record_call("GET /two", 1, true, None);
    telemetry.record_call("GET /three", 1, true, None);
    telemetry.record_call("GET /four", 1, true, None);
    // 이미 등록된 이름은 계속 자기 버킷으로
    telemetry.record_call("get /ONE", 1, true, None);

    let summary = whole_window(&telemetry);
    assert_eq!(summary.endpoint(UNKNOWN_ENDPOINT).unwrap().call_count, 2);
    assert_eq!(summary.endpoint("GET /one").unwrap().call_count, 2);
    assert_eq!(summary.endpoint(OVERFLOW_ENDPOINT).unwrap().call_count, 2);
    assert!(summary.endpoint("GET /three").is_none());
    assert!(summary.endpoint("GET /four").is_none());

    let error = &summary.top_errors[0];
    assert_eq!(error.endpoint, UNKNOWN_ENDPOINT);
    assert_eq!(error.error_kind, UNKNOWN_ERROR_KIND);
}

#[test]
fn test_top_errors_are_ranked_and_truncated() {
    let telemetry = TelemetryAggregator::new(16, 16, 2);

    for _ in 0..3 {
        telemetry.record_call("GET /products", 5, false, Some("store_error"));
    }
    telemetry.record_call("GET /products", 5, false, Some("cancelled"));
    for _ in 0..2 {
        telemetry.record_call("POST /simulations", 5, false, Some("below_minimum_investment"));
    }

    let summary = whole_window(&telemetry);
    let kinds: Vec<&str> = summary.top_errors.iter().map(|e| e.error_kind.as_str()).collect();
    assert_eq!(kinds, vec!["store_error", "below_minimum_investment"]);
    assert_eq!(summary.total_errors, 6);
}

#[test]
fn test_window_excludes_stale_activity() {
    let telemetry = TelemetryAggregator::new(16, 16, 5);
    telemetry.record_call("GET /products", 5, true, None);

    let future = telemetry.snapshot(Utc::now() + Duration::hours(1), Utc::now() + Duration::hours(2));
    assert!(future.endpoints.is_empty());
    assert_eq!(future.total_calls, 0);
}

#[tokio::test]
async fn test_services_report_their_calls() {
    let engine = AdvisorEngine::assemble(
        &AdvisorConfig::default(),
        Arc::new(InMemoryProductStore::new()),
        Arc::new(InMemorySharedCache::new()),
        Arc::new(InMemoryClientStore::new()),
    );
    let cancel = CancellationToken::new();

    engine.matcher.recommend_named("cdb", None, &cancel).await.unwrap();
    assert!(engine.matcher.recommend_named("crypto", None, &cancel).await.is_err());
    assert!(engine.risk.compute(9, &cancel).await.is_err());

    let summary = whole_window(&engine.telemetry);
    assert_eq!(summary.endpoint("GET /products/recommend/cdb").unwrap().success_count, 1);
    assert_eq!(summary.endpoint("GET /products/recommend").unwrap().error_count, 1);
    assert_eq!(summary.endpoint("POST /clients/{n}/risk-profile").unwrap().error_count, 1);

    let kinds: Vec<&str> = summary.top_errors.iter().map(|e| e.error_kind.as_str()).collect();
    assert!(kinds.contains(&"unknown_product_type"));
    assert!(kinds.contains(&"client_not_found"));

    engine.shutdown().await;
}
