//! 투자 시뮬레이션
//!
//! 고객 성향에 가장 가까운 상품을 골라 만기 금액을 계산하고, 시뮬레이션을 이력에 남긴 뒤
//! 위험 성향 프로필을 다시 계산합니다.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::{ClientRepository, HistoryRepository};
use crate::domain::{ClientId, Product, ProductDaySummary, ProductType, RiskProfile, SimulationRecord};
use crate::error::{AdvisorError, AdvisorResult};
use crate::recommendation::{assess, RecommendationMatcher, Suitability};
use crate::risk::RiskProfileService;
use crate::telemetry::TelemetryAggregator;
use crate::util::cancellable;

/// 시뮬레이션 요청
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub client_id: ClientId,
    pub product_type: ProductType,
    pub amount: f64,
    pub term_months: u32,
}

/// 규제 고지 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclaimerKind {
    /// 예금자 보호(FGC)
    DepositGuarantee,
    FixedIncome,
    VariableIncome,
}

/// 규제 고지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disclaimer {
    pub kind: DisclaimerKind,
    pub text: String,
    pub mandatory: bool,
}

/// 시뮬레이션 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub id: Uuid,
    pub product: Product,
    pub amount: f64,
    pub final_amount: f64,
    /// (최종 금액 - 원금) / 원금
    pub effective_return: f64,
    pub term_months: u32,
    pub simulated_at: DateTime<Utc>,
    /// 시뮬레이션 시점의 성향 기준 적합성
    pub suitability: Suitability,
    pub disclaimer: Disclaimer,
    /// 시뮬레이션 반영 후 재계산된 프로필
    pub profile: RiskProfile,
}

/// 상품별 일별 집계의 기본 조회 기간 (일)
pub const DEFAULT_REPORT_DAYS: i64 = 30;

/// 월복리 만기 금액: `amount × (1 + annual_yield / 12)^months`
pub fn project_final_amount(amount: f64, annual_yield: f64, term_months: u32) -> f64 {
    let monthly = annual_yield / 12.0;
    amount * (1.0 + monthly).powi(term_months as i32)
}

pub fn disclaimer_for(product_type: ProductType) -> Disclaimer {
    let (kind, text) = match product_type {
        ProductType::Cdb => (
            DisclaimerKind::DepositGuarantee,
            "FGC 보장 상품은 CPF 및 금융기관당 R$ 250.000,00까지 보장됩니다",
        ),
        ProductType::Lci | ProductType::Lca | ProductType::TesouroDireto => (
            DisclaimerKind::FixedIncome,
            "확정 수익 상품도 금리 및 물가 변동에 따른 시장 위험이 있습니다",
        ),
        ProductType::Fundo => (
            DisclaimerKind::VariableIncome,
            "과거 수익률이 미래 수익을 보장하지 않으며 원금 손실이 발생할 수 있습니다",
        ),
    };

    Disclaimer {
        kind,
        text: text.to_string(),
        mandatory: true,
    }
}

/// 투자 시뮬레이션 서비스
pub struct SimulationService {
    clients: Arc<dyn ClientRepository>,
    history: Arc<dyn HistoryRepository>,
    matcher: Arc<RecommendationMatcher>,
    profiles: Arc<RiskProfileService>,
    telemetry: Arc<TelemetryAggregator>,
}

impl SimulationService {
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        history: Arc<dyn HistoryRepository>,
        matcher: Arc<RecommendationMatcher>,
        profiles: Arc<RiskProfileService>,
        telemetry: Arc<TelemetryAggregator>,
    ) -> Self {
        Self {
            clients,
            history,
            matcher,
            profiles,
            telemetry,
        }
    }

    pub async fn simulate(
        &self,
        request: &SimulationRequest,
        cancel: &CancellationToken,
    ) -> AdvisorResult<SimulationOutcome> {
        self.telemetry
            .timed("POST /simulations", self.run(request, cancel))
            .await
    }

    /// 전체 시뮬레이션 이력 (최신순)
    pub async fn list_simulations(&self, cancel: &CancellationToken) -> AdvisorResult<Vec<SimulationRecord>> {
        self.telemetry
            .timed("GET /simulations", cancellable(cancel, self.history.list_simulations()))
            .await
    }

    /// 상품별 일별 시뮬레이션 건수와 평균 최종 금액
    ///
    /// 시작일 기본값은 오늘로부터 `DEFAULT_REPORT_DAYS`일 전, 종료일 기본값은 오늘 (UTC).
    /// 양 끝 날짜 포함. 시작일이 종료일보다 늦으면 빈 목록
    pub async fn simulations_by_product_day(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        cancel: &CancellationToken,
    ) -> AdvisorResult<Vec<ProductDaySummary>> {
        let today = Utc::now().date_naive();
        let start = start.unwrap_or(today - Duration::days(DEFAULT_REPORT_DAYS));
        let end = end.unwrap_or(today);

        info!("상품별 일별 시뮬레이션 조회: {} ~ {}", start, end);

        self.telemetry
            .timed(
                "GET /simulations/by-product-day",
                cancellable(cancel, self.history.simulations_by_product_day(start, end)),
            )
            .await
    }

    async fn run(&self, request: &SimulationRequest, cancel: &CancellationToken) -> AdvisorResult<SimulationOutcome> {
        let client_id = request.client_id;
        if cancellable(cancel, self.clients.get_client(client_id)).await?.is_none() {
            return Err(AdvisorError::ClientNotFound(client_id));
        }

        let classification = cancellable(cancel, self.clients.get_risk_profile(client_id))
            .await?
            .map(|profile| profile.classification);

        let product = self
            .matcher
            .recommend(request.product_type, classification, cancel)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::NoProductForType(request.product_type.to_string()))?;

        if request.amount <= 0.0 || request.amount < product.min_investment {
            return Err(AdvisorError::BelowMinimumInvestment {
                minimum: product.min_investment,
                requested: request.amount,
            });
        }

        let final_amount = project_final_amount(request.amount, product.annual_yield, request.term_months);
        let simulated_at = Utc::now();
        let record = SimulationRecord {
            id: Uuid::new_v4(),
            client_id,
            product_id: product.id,
            product_name: product.name.clone(),
            product_type: product.product_type,
            risk_level: product.risk_level,
            allows_early_withdrawal: product.allows_early_withdrawal,
            amount: request.amount,
            final_amount,
            term_months: request.term_months,
            simulated_at,
        };

        cancellable(cancel, self.history.add_simulation(&record)).await?;
        let profile = self.profiles.recompute(client_id, cancel).await?;

        info!(
            "시뮬레이션 완료: 고객 {}, 상품 {}, {:.2} → {:.2} ({}개월), 성향 {}",
            client_id,
            product.name,
            request.amount,
            final_amount,
            request.term_months,
            classification.map_or("미평가", |c| c.as_str())
        );

        let suitability = assess(product.risk_level, classification);
        if classification.is_some() && !suitability.is_suitable() {
            warn!("고객 {} 성향과 맞지 않는 상품 시뮬레이션: {} ({})", client_id, product.name, suitability);
        }

        Ok(SimulationOutcome {
            id: record.id,
            suitability,
            disclaimer: disclaimer_for(product.product_type),
            effective_return: (final_amount - request.amount) / request.amount,
            amount: request.amount,
            final_amount,
            term_months: request.term_months,
            simulated_at,
            product,
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_compounds_monthly() {
        assert_eq!(project_final_amount(1000.0, 0.12, 0), 1000.0);

        let one_month = project_final_amount(1000.0, 0.12, 1);
        assert!((one_month - 1010.0).abs() < 1e-9);

        let one_year = project_final_amount(1000.0, 0.12, 12);
        assert!((one_year - 1126.825030131969).abs() < 1e-6);
    }

    #[test]
    fn test_disclaimers() {
        assert_eq!(disclaimer_for(ProductType::Cdb).kind, DisclaimerKind::DepositGuarantee);
        for product_type in [ProductType::Lci, ProductType::Lca, ProductType::TesouroDireto] {
            assert_eq!(disclaimer_for(product_type).kind, DisclaimerKind::FixedIncome);
        }
        let fund = disclaimer_for(ProductType::Fundo);
        assert_eq!(fund.kind, DisclaimerKind::VariableIncome);
        assert!(fund.mandatory);
    }
}
