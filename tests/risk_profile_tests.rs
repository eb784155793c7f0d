//! 위험 성향 계산 통합 테스트

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use xinvest::db::{ClientRepository, HistoryRepository, InMemoryClientStore};
use xinvest::domain::{
    BehavioralAggregate, Classification, Client, FinancialSnapshot, Horizon, InvestmentRecord, Objective, ProductType,
    RiskLevel, SimulationRecord,
};
use xinvest::risk::{aggregate, RiskProfileScorer, RiskProfileService};
use xinvest::telemetry::TelemetryAggregator;
use xinvest::AdvisorError;

fn no_history_snapshot(client_id: i64) -> FinancialSnapshot {
    FinancialSnapshot {
        client_id,
        monthly_income: 3_000.0,
        net_worth: 20_000.0,
        active_debt: 5_000.0,
        dependents: 2,
        horizon: Horizon::Short,
        objective: Objective::EmergencyReserve,
        loss_tolerance: 0,
        has_experience: false,
    }
}

fn wealthy_snapshot(client_id: i64) -> FinancialSnapshot {
    FinancialSnapshot {
        client_id,
        monthly_income: 50_000.0,
        net_worth: 500_000.0,
        active_debt: 0.0,
        dependents: 0,
        horizon: Horizon::Long,
        objective: Objective::WealthGrowth,
        loss_tolerance: 9,
        has_experience: true,
    }
}

fn service(store: Arc<InMemoryClientStore>) -> RiskProfileService {
    RiskProfileService::new(store.clone(), store.clone(), store, Arc::new(TelemetryAggregator::new(100, 64, 10)))
}

#[test]
fn test_zero_activity_is_conservative() {
    let scorer = RiskProfileScorer::new();
    let behavior = BehavioralAggregate::new(1, 0.0, 0, false);

    let without_snapshot = scorer.compute_risk_profile(&behavior, None);
    assert_eq!(without_snapshot.classification, Classification::Conservative);
    assert_eq!(without_snapshot.breakdown.volume, 5);
    assert_eq!(without_snapshot.breakdown.frequency, 0);

    // 설문 점수가 높아도 이력이 없으면 보수형
    let with_snapshot = scorer.compute_risk_profile(&behavior, Some(&wealthy_snapshot(1)));
    assert_eq!(with_snapshot.classification, Classification::Conservative);
}

#[test]
fn test_scoring_is_pure() {
    let scorer = RiskProfileScorer::new();
    let behavior = BehavioralAggregate::new(3, 73_500.0, 7, true);
    let snapshot = wealthy_snapshot(3);
    let now = Utc::now();

    let first = scorer.compute_risk_profile_at(&behavior, Some(&snapshot), now);
    for _ in 0..50 {
        assert_eq!(scorer.compute_risk_profile_at(&behavior, Some(&snapshot), now), first);
    }
}

#[test]
fn test_score_is_monotonic_in_volume() {
    let scorer = RiskProfileScorer::new();
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let frequency = rng.gen_range(0..30);
        let liquid = rng.gen_bool(0.5);
        let snapshot = FinancialSnapshot {
            net_worth: rng.gen_range(1_000.0..2_000_000.0),
            loss_tolerance: rng.gen_range(0..=10),
            ..wealthy_snapshot(1)
        };

        let mut volumes: Vec<f64> = (0..10).map(|_| rng.gen_range(0.0..2_000_000.0)).collect();
        volumes.sort_by(f64::total_cmp);

        let scores: Vec<i32> = volumes
            .iter()
            .map(|volume| {
                let behavior = BehavioralAggregate::new(1, *volume, frequency, liquid);
                scorer.compute_risk_profile(&behavior, Some(&snapshot)).score
            })
            .collect();

        assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{:?} / {:?}", volumes, scores);
    }
}

#[test]
fn test_no_history_client_with_snapshot_is_conservative() {
    let behavior = BehavioralAggregate::new(1, 0.0, 0, true);
    let profile = RiskProfileScorer::new().compute_risk_profile(&behavior, Some(&no_history_snapshot(1)));

    // 5 + 0 + 3 + 1 + 0 + 3 + 0
    assert_eq!(profile.score, 12);
    assert_eq!(profile.classification, Classification::Conservative);
}

#[test]
fn test_experienced_high_volume_client_is_aggressive() {
    let behavior = BehavioralAggregate::new(2, 500_000.0, 20, true);
    let profile = RiskProfileScorer::new().compute_risk_profile(&behavior, Some(&wealthy_snapshot(2)));

    // 25 + 20 + 3 + 10 + 18 + 10 + 10
    assert_eq!(profile.score, 96);
    assert_eq!(profile.classification, Classification::Aggressive);
}

#[tokio::test]
async fn test_service_unknown_client_is_not_found() {
    let store = Arc::new(InMemoryClientStore::new());
    let service = service(store);

    let result = service.compute(404, &CancellationToken::new()).await;
    assert!(matches!(result, Err(AdvisorError::ClientNotFound(404))));
}

#[tokio::test]
async fn test_service_recomputes_when_inputs_change() {
    let store = Arc::new(InMemoryClientStore::new());
    store.add_client(Client { id: 5, name: "Carla".to_string() }).await;
    let service = service(store.clone());
    let cancel = CancellationToken::new();

    let initial = service.get_or_compute(5, &cancel).await.unwrap();
    assert_eq!(initial.classification, Classification::Conservative);

    // 최근 이력 + 공격적 설문
    for days_ago in 0..12 {
        let applied_at = Utc::now() - Duration::days(days_ago * 20);
        store
            .add_investment(&InvestmentRecord {
                id: Uuid::new_v4(),
                client_id: 5,
                product_id: Uuid::new_v4(),
                product_type: ProductType::Fundo,
                risk_level: RiskLevel::High,
                allows_early_withdrawal: false,
                amount: 60_000.0,
                term_months: 36,
                applied_at,
                redeemed_at: None,
            })
            .await
            .unwrap();
    }
    store
        .add_simulation(&SimulationRecord {
            id: Uuid::new_v4(),
            client_id: 5,
            product_id: Uuid::new_v4(),
            product_name: "CDB Pós".to_string(),
            product_type: ProductType::Cdb,
            risk_level: RiskLevel::Medium,
            allows_early_withdrawal: false,
            amount: 10_000.0,
            final_amount: 11_000.0,
            term_months: 24,
            simulated_at: Utc::now(),
        })
        .await
        .unwrap();

    let updated = service.update_financial_snapshot(&wealthy_snapshot(5), &cancel).await.unwrap();
    assert_eq!(updated.classification, Classification::Aggressive);
    assert_eq!(store.get_risk_profile(5).await.unwrap(), Some(updated.clone()));

    // 저장된 프로필을 그대로 반환
    let cached = service.get_or_compute(5, &cancel).await.unwrap();
    assert_eq!(cached, updated);
}

#[tokio::test]
async fn test_cancelled_computation() {
    let store = Arc::new(InMemoryClientStore::new());
    store.add_client(Client { id: 8, name: "Davi".to_string() }).await;
    let service = service(store);
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(matches!(service.compute(8, &cancel).await, Err(AdvisorError::Cancelled)));
}

#[tokio::test]
async fn test_recorded_investment_recomputes_profile() {
    let store = Arc::new(InMemoryClientStore::new());
    store.add_client(Client { id: 6, name: "Elisa".to_string() }).await;
    let service = service(store.clone());
    let cancel = CancellationToken::new();

    // 이력 없음: 5 + 0 + 3
    let before = service.compute(6, &cancel).await.unwrap();
    assert_eq!(before.score, 8);

    let investment = InvestmentRecord {
        id: Uuid::new_v4(),
        client_id: 6,
        product_id: Uuid::new_v4(),
        product_type: ProductType::Lci,
        risk_level: RiskLevel::Low,
        allows_early_withdrawal: false,
        amount: 20_000.0,
        term_months: 36,
        applied_at: Utc::now() - Duration::days(10),
        redeemed_at: None,
    };
    let after = service.record_investment(&investment, &cancel).await.unwrap();

    let history = store.get_history(6).await.unwrap();
    assert_eq!(history.investments, vec![investment]);
    assert_eq!(aggregate(6, &history, Utc::now()).recency_weighted_frequency, 2);

    // 10 + 5 + 10: 확정 투자는 빈도 2, 비유동 장기 투자
    assert_eq!(after.breakdown.volume, 10);
    assert_eq!(after.breakdown.frequency, 5);
    assert_eq!(after.breakdown.liquidity, 10);
    assert_eq!(after.score, 25);
    assert_ne!(after, before);
    assert_eq!(store.get_risk_profile(6).await.unwrap(), Some(after));
}

#[tokio::test]
async fn test_investment_for_unknown_client_is_not_recorded() {
    let store = Arc::new(InMemoryClientStore::new());
    let service = service(store.clone());

    let investment = InvestmentRecord {
        id: Uuid::new_v4(),
        client_id: 31,
        product_id: Uuid::new_v4(),
        product_type: ProductType::Cdb,
        risk_level: RiskLevel::Low,
        allows_early_withdrawal: true,
        amount: 1_000.0,
        term_months: 6,
        applied_at: Utc::now(),
        redeemed_at: None,
    };

    let result = service.record_investment(&investment, &CancellationToken::new()).await;
    assert!(matches!(result, Err(AdvisorError::ClientNotFound(31))));
    assert!(store.get_history(31).await.unwrap().investments.is_empty());
}
