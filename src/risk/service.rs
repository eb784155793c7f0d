use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use super::behavior;
use super::scorer::RiskProfileScorer;
use crate::db::{ClientRepository, FinancialProfileRepository, HistoryRepository};
use crate::domain::{ClientId, FinancialSnapshot, InvestmentRecord, RiskProfile};
use crate::error::{AdvisorError, AdvisorResult};
use crate::telemetry::TelemetryAggregator;
use crate::util::cancellable;

/// 위험 성향 프로필 서비스
///
/// 이력과 재무 설문을 모아 점수를 계산하고 결과를 저장합니다.
/// 입력 중 하나가 바뀔 때마다 프로필 전체를 다시 계산합니다.
pub struct RiskProfileService {
    clients: Arc<dyn ClientRepository>,
    financial: Arc<dyn FinancialProfileRepository>,
    history: Arc<dyn HistoryRepository>,
    scorer: RiskProfileScorer,
    telemetry: Arc<TelemetryAggregator>,
}

impl RiskProfileService {
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        financial: Arc<dyn FinancialProfileRepository>,
        history: Arc<dyn HistoryRepository>,
        telemetry: Arc<TelemetryAggregator>,
    ) -> Self {
        Self {
            clients,
            financial,
            history,
            scorer: RiskProfileScorer::new(),
            telemetry,
        }
    }

    /// 프로필 재계산 후 저장
    pub async fn compute(&self, client_id: ClientId, cancel: &CancellationToken) -> AdvisorResult<RiskProfile> {
        let endpoint = format!("POST /clients/{}/risk-profile", client_id);
        self.telemetry
            .timed(&endpoint, self.recompute(client_id, cancel))
            .await
    }

    /// 저장된 프로필 조회. 없으면 계산
    pub async fn get_or_compute(&self, client_id: ClientId, cancel: &CancellationToken) -> AdvisorResult<RiskProfile> {
        let endpoint = format!("GET /clients/{}/risk-profile", client_id);
        self.telemetry
            .timed(&endpoint, async {
                if let Some(profile) = cancellable(cancel, self.clients.get_risk_profile(client_id)).await? {
                    debug!("저장된 프로필 사용: 고객 {}", client_id);
                    return Ok(profile);
                }
                self.recompute(client_id, cancel).await
            })
            .await
    }

    /// 재무 설문 저장 후 재계산
    pub async fn update_financial_snapshot(
        &self,
        snapshot: &FinancialSnapshot,
        cancel: &CancellationToken,
    ) -> AdvisorResult<RiskProfile> {
        let endpoint = format!("PUT /clients/{}/financial-profile", snapshot.client_id);
        self.telemetry
            .timed(&endpoint, async {
                self.ensure_client(snapshot.client_id, cancel).await?;
                cancellable(cancel, self.financial.upsert_snapshot(snapshot)).await?;
                self.recompute(snapshot.client_id, cancel).await
            })
            .await
    }

    /// 확정 투자 기록 후 재계산
    pub async fn record_investment(
        &self,
        investment: &InvestmentRecord,
        cancel: &CancellationToken,
    ) -> AdvisorResult<RiskProfile> {
        let endpoint = format!("POST /clients/{}/investments", investment.client_id);
        self.telemetry
            .timed(&endpoint, async {
                self.ensure_client(investment.client_id, cancel).await?;
                cancellable(cancel, self.history.add_investment(investment)).await?;
                self.recompute(investment.client_id, cancel).await
            })
            .await
    }

    /// 이력 변경(시뮬레이션 등) 후 호출되는 재계산. 텔레메트리는 호출자가 기록
    pub(crate) async fn recompute(&self, client_id: ClientId, cancel: &CancellationToken) -> AdvisorResult<RiskProfile> {
        self.ensure_client(client_id, cancel).await?;

        let history = cancellable(cancel, self.history.get_history(client_id)).await?;
        let snapshot = cancellable(cancel, self.financial.get_snapshot(client_id)).await?;
        let previous = cancellable(cancel, self.clients.get_risk_profile(client_id)).await?;

        let aggregate = behavior::aggregate(client_id, &history, Utc::now());
        let profile = self.scorer.compute_risk_profile(&aggregate, snapshot.as_ref());

        cancellable(cancel, self.clients.upsert_risk_profile(&profile)).await?;

        match previous {
            Some(previous) => info!(
                "고객 {} 위험 성향 갱신: {}({}) → {}({})",
                client_id, previous.classification, previous.score, profile.classification, profile.score
            ),
            None => info!(
                "고객 {} 위험 성향 최초 계산: {}({})",
                client_id, profile.classification, profile.score
            ),
        }

        Ok(profile)
    }

    async fn ensure_client(&self, client_id: ClientId, cancel: &CancellationToken) -> AdvisorResult<()> {
        match cancellable(cancel, self.clients.get_client(client_id)).await? {
            Some(_) => Ok(()),
            None => Err(AdvisorError::ClientNotFound(client_id)),
        }
    }
}
