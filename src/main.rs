use anyhow::Context;
use chrono::Utc;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use xinvest::domain::{
    Classification, Client, FinancialSnapshot, Horizon, Objective, Product, ProductType, RiskLevel,
};
use xinvest::simulation::SimulationRequest;
use xinvest::{AdvisorConfig, AdvisorEngine};

/// 데모 상품 카탈로그
fn demo_products() -> Vec<Product> {
    vec![
        Product::new("CDB Liquidez Diária", ProductType::Cdb, 0.105, RiskLevel::Low, 0, 100.0, true, Classification::Conservative),
        Product::new("CDB Pós 2 anos", ProductType::Cdb, 0.13, RiskLevel::Medium, 720, 5_000.0, false, Classification::Moderate),
        Product::new("CDB Pré 3 anos", ProductType::Cdb, 0.12, RiskLevel::Medium, 1080, 1_000.0, false, Classification::Moderate),
        Product::new("LCI 1 ano", ProductType::Lci, 0.095, RiskLevel::Low, 365, 1_000.0, false, Classification::Conservative),
        Product::new("LCA Agro", ProductType::Lca, 0.10, RiskLevel::Low, 540, 5_000.0, false, Classification::Conservative),
        Product::new("Tesouro Selic", ProductType::TesouroDireto, 0.1075, RiskLevel::Low, 0, 30.0, true, Classification::Conservative),
        Product::new("Tesouro IPCA+ 2035", ProductType::TesouroDireto, 0.115, RiskLevel::Medium, 3650, 30.0, true, Classification::Moderate),
        Product::new("Fundo Multimercado", ProductType::Fundo, 0.16, RiskLevel::High, 30, 1_000.0, true, Classification::Aggressive),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 xinvest 시작");

    let config = AdvisorConfig::from_env();
    info!("설정: {:?}", config);

    let engine = AdvisorEngine::build(&config)
        .await
        .context("엔진 초기화 실패")?;
    let cancel = CancellationToken::new();
    let started_at = Utc::now();

    // 1. 카탈로그 적재
    for product in demo_products() {
        if let Err(e) = engine.catalog.add(&product, &cancel).await {
            warn!("상품 추가 실패 (이미 존재할 수 있음): {}", e);
        }
    }

    // 2. 고객 등록과 재무 설문
    engine.clients.add_client(Client { id: 1, name: "Ana".to_string() }).await;
    engine.clients.add_client(Client { id: 2, name: "Bruno".to_string() }).await;

    let cautious = FinancialSnapshot {
        client_id: 1,
        monthly_income: 3_000.0,
        net_worth: 20_000.0,
        active_debt: 5_000.0,
        dependents: 2,
        horizon: Horizon::Short,
        objective: Objective::EmergencyReserve,
        loss_tolerance: 0,
        has_experience: false,
    };
    let bold = FinancialSnapshot {
        client_id: 2,
        monthly_income: 40_000.0,
        net_worth: 500_000.0,
        active_debt: 0.0,
        dependents: 0,
        horizon: Horizon::Long,
        objective: Objective::WealthGrowth,
        loss_tolerance: 9,
        has_experience: true,
    };

    for snapshot in [&cautious, &bold] {
        let profile = engine.risk.update_financial_snapshot(snapshot, &cancel).await?;
        info!("고객 {} → {} ({}점): {}", profile.client_id, profile.classification, profile.score, profile.rationale);
    }

    // 3. 시뮬레이션
    let requests = [
        SimulationRequest { client_id: 1, product_type: ProductType::Cdb, amount: 2_000.0, term_months: 12 },
        SimulationRequest { client_id: 2, product_type: ProductType::Fundo, amount: 150_000.0, term_months: 36 },
        SimulationRequest { client_id: 2, product_type: ProductType::Lci, amount: 10.0, term_months: 12 },
    ];
    for request in &requests {
        match engine.simulation.simulate(request, &cancel).await {
            Ok(outcome) => info!(
                "💰 {} {:.2} → {:.2} ({:.2}%), {}, 고지: {}",
                outcome.product.name,
                outcome.amount,
                outcome.final_amount,
                outcome.effective_return * 100.0,
                outcome.suitability,
                outcome.disclaimer.text
            ),
            Err(e) => warn!("시뮬레이션 거절 (고객 {}): {}", request.client_id, e),
        }
    }

    // 4. 추천 (두 번째 호출은 캐시에서 응답)
    for _ in 0..2 {
        let recommended = engine
            .matcher
            .recommend_named("CDB", Some(Classification::Conservative), &cancel)
            .await?;
        let names: Vec<&str> = recommended.iter().map(|p| p.name.as_str()).collect();
        info!("추천 (CDB, conservative): {:?}", names);
    }
    if let Err(e) = engine.matcher.recommend_named("crypto", None, &cancel).await {
        warn!("추천 실패: {}", e);
    }

    // 5. 요약
    engine.catalog.cache().metrics().print_stats();
    engine
        .telemetry
        .snapshot(started_at, Utc::now() + chrono::Duration::seconds(1))
        .print_summary();
    info!(
        "텔레메트리: 엔드포인트 {}개, 가동 {:?}",
        engine.telemetry.endpoint_count(),
        engine.telemetry.uptime()
    );

    engine.shutdown().await;

    info!("✅ xinvest 종료");
    Ok(())
}
