//! 위험 성향 점수 계산
//!
//! 항목별 구간 점수를 더하는 가산 모델입니다. 입출력이 없는 순수 계산이며
//! 프로필은 항상 입력 전체로부터 새로 만들어집니다.

use chrono::{DateTime, Utc};

use crate::domain::{BehavioralAggregate, Classification, FinancialSnapshot, Horizon, RiskProfile, ScoreBreakdown};

/// 이 점수 이하는 보수형
pub const CONSERVATIVE_MAX: i32 = 35;
/// 이 점수 이하는 중립형, 초과는 공격형
pub const MODERATE_MAX: i32 = 65;

/// 거래량 구간 상한과 점수. 마지막 구간 이상은 `VOLUME_TOP_POINTS`
const VOLUME_BANDS: [(f64, i32); 5] = [
    (10_000.0, 5),
    (50_000.0, 10),
    (100_000.0, 15),
    (500_000.0, 20),
    (1_000_000.0, 25),
];
const VOLUME_TOP_POINTS: i32 = 30;

const LIQUID_POINTS: i32 = 3;
const ILLIQUID_POINTS: i32 = 10;
const EXPERIENCE_POINTS: i32 = 10;
const LOSS_TOLERANCE_WEIGHT: i32 = 2;

/// 위험 성향 점수 계산기
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskProfileScorer;

impl RiskProfileScorer {
    pub fn new() -> Self {
        Self
    }

    /// 행동 집계와 (선택) 재무 설문으로 프로필 계산
    pub fn compute_risk_profile(
        &self,
        behavior: &BehavioralAggregate,
        snapshot: Option<&FinancialSnapshot>,
    ) -> RiskProfile {
        self.compute_risk_profile_at(behavior, snapshot, Utc::now())
    }

    /// 갱신 시각을 지정해 계산
    pub fn compute_risk_profile_at(
        &self,
        behavior: &BehavioralAggregate,
        snapshot: Option<&FinancialSnapshot>,
        now: DateTime<Utc>,
    ) -> RiskProfile {
        let breakdown = score_breakdown(behavior, snapshot);
        let score = breakdown.total();
        let classification = classify(score);

        RiskProfile {
            client_id: behavior.client_id,
            score,
            classification,
            rationale: rationale(behavior, snapshot, &breakdown, score, classification),
            breakdown,
            last_updated: now,
        }
    }
}

/// 점수 → 성향. 임계값에 대해 단조
pub fn classify(score: i32) -> Classification {
    if score <= CONSERVATIVE_MAX {
        Classification::Conservative
    } else if score <= MODERATE_MAX {
        Classification::Moderate
    } else {
        Classification::Aggressive
    }
}

/// 항목별 점수 계산
pub fn score_breakdown(behavior: &BehavioralAggregate, snapshot: Option<&FinancialSnapshot>) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown {
        volume: volume_points(behavior.total_volume),
        frequency: frequency_points(behavior.recency_weighted_frequency),
        liquidity: liquidity_points(behavior.liquidity_preference),
        ..Default::default()
    };

    if let Some(snapshot) = snapshot {
        breakdown.net_worth_share = net_worth_share_points(behavior.total_volume, snapshot.net_worth);
        breakdown.loss_tolerance = loss_tolerance_points(snapshot.loss_tolerance);
        breakdown.horizon = horizon_points(snapshot.horizon);
        breakdown.experience = if snapshot.has_experience { EXPERIENCE_POINTS } else { 0 };
    }

    // 거래 이력이 전혀 없으면 보수형 범위를 넘지 않음
    if behavior.total_volume <= 0.0 && behavior.recency_weighted_frequency == 0 {
        breakdown.new_client_cap = (breakdown.total() - CONSERVATIVE_MAX).max(0);
    }

    breakdown
}

pub fn volume_points(volume: f64) -> i32 {
    VOLUME_BANDS
        .iter()
        .find(|(upper, _)| volume < *upper)
        .map_or(VOLUME_TOP_POINTS, |(_, points)| *points)
}

pub fn frequency_points(frequency: u32) -> i32 {
    match frequency {
        0 => 0,
        1..=4 => 5,
        5..=9 => 10,
        10..=19 => 15,
        _ => 20,
    }
}

/// 유동성을 선호할수록 낮은 점수
pub fn liquidity_points(prefers_liquidity: bool) -> i32 {
    if prefers_liquidity {
        LIQUID_POINTS
    } else {
        ILLIQUID_POINTS
    }
}

/// 순자산 대비 투자 비중
pub fn net_worth_share_points(volume: f64, net_worth: f64) -> i32 {
    if net_worth <= 0.0 {
        return 1;
    }

    let share = volume / net_worth;
    if share < 0.10 {
        1
    } else if share < 0.25 {
        3
    } else if share < 0.50 {
        6
    } else {
        10
    }
}

pub fn loss_tolerance_points(tolerance: u8) -> i32 {
    i32::from(tolerance.min(10)) * LOSS_TOLERANCE_WEIGHT
}

pub fn horizon_points(horizon: Horizon) -> i32 {
    match horizon {
        Horizon::Short => 3,
        Horizon::Medium => 7,
        Horizon::Long => 10,
    }
}

fn rationale(
    behavior: &BehavioralAggregate,
    snapshot: Option<&FinancialSnapshot>,
    breakdown: &ScoreBreakdown,
    score: i32,
    classification: Classification,
) -> String {
    let mut parts = vec![
        format!("거래량 {:.2} → {}점", behavior.total_volume, breakdown.volume),
        format!("최근 빈도 {} → {}점", behavior.recency_weighted_frequency, breakdown.frequency),
        format!(
            "유동성 {} → {}점",
            if behavior.liquidity_preference { "선호" } else { "비선호" },
            breakdown.liquidity
        ),
    ];

    match snapshot {
        Some(snapshot) => {
            parts.push(format!("순자산 비중 {}점", breakdown.net_worth_share));
            parts.push(format!("손실 허용도 {} → {}점", snapshot.loss_tolerance.min(10), breakdown.loss_tolerance));
            parts.push(format!("투자 기간 {:?} → {}점", snapshot.horizon, breakdown.horizon));
            parts.push(format!("투자 경험 {}점", breakdown.experience));
        }
        None => parts.push("재무 설문 없음".to_string()),
    }

    if breakdown.new_client_cap > 0 {
        parts.push(format!("거래 이력 없음: {}점 차감", breakdown.new_client_cap));
    }
    if let Some(tendency) = behavior.observed_tendency {
        parts.push(format!("관측 성향 {} (참고)", tendency));
    }

    format!("{}; 총점 {} → {}", parts.join(", "), score, classification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Objective;

    fn snapshot(net_worth: f64, horizon: Horizon, loss_tolerance: u8, has_experience: bool) -> FinancialSnapshot {
        FinancialSnapshot {
            client_id: 1,
            monthly_income: 10_000.0,
            net_worth,
            active_debt: 0.0,
            dependents: 0,
            horizon,
            objective: Objective::WealthGrowth,
            loss_tolerance,
            has_experience,
        }
    }

    #[test]
    fn test_volume_bands() {
        assert_eq!(volume_points(0.0), 5);
        assert_eq!(volume_points(9_999.99), 5);
        assert_eq!(volume_points(10_000.0), 10);
        assert_eq!(volume_points(99_999.0), 15);
        assert_eq!(volume_points(500_000.0), 25);
        assert_eq!(volume_points(1_000_000.0), 30);
    }

    #[test]
    fn test_frequency_bands() {
        let points: Vec<i32> = [0, 1, 4, 5, 9, 10, 19, 20, 500].iter().map(|f| frequency_points(*f)).collect();
        assert_eq!(points, vec![0, 5, 5, 10, 10, 15, 15, 20, 20]);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(classify(i32::MIN), Classification::Conservative);
        assert_eq!(classify(35), Classification::Conservative);
        assert_eq!(classify(36), Classification::Moderate);
        assert_eq!(classify(65), Classification::Moderate);
        assert_eq!(classify(66), Classification::Aggressive);
    }

    #[test]
    fn test_experience_is_additive() {
        let behavior = BehavioralAggregate::new(1, 20_000.0, 3, false);
        let without = score_breakdown(&behavior, Some(&snapshot(100_000.0, Horizon::Medium, 5, false)));
        let with = score_breakdown(&behavior, Some(&snapshot(100_000.0, Horizon::Medium, 5, true)));

        assert!(without.total() > 0);
        assert_eq!(with.total() - without.total(), 10);
    }

    #[test]
    fn test_new_client_cap() {
        let behavior = BehavioralAggregate::new(1, 0.0, 0, false);
        let breakdown = score_breakdown(&behavior, Some(&snapshot(1_000_000.0, Horizon::Long, 10, true)));

        // 5 + 0 + 10 + 1 + 20 + 10 + 10 = 56
        assert_eq!(breakdown.new_client_cap, 56 - CONSERVATIVE_MAX);
        assert_eq!(breakdown.total(), CONSERVATIVE_MAX);
    }

    #[test]
    fn test_loss_tolerance_is_capped() {
        assert_eq!(loss_tolerance_points(0), 0);
        assert_eq!(loss_tolerance_points(10), 20);
        assert_eq!(loss_tolerance_points(200), 20);
    }

    #[test]
    fn test_rationale_mentions_inputs() {
        let mut behavior = BehavioralAggregate::new(1, 0.0, 0, true);
        behavior.observed_tendency = Some(Classification::Moderate);
        let profile = RiskProfileScorer::new().compute_risk_profile(&behavior, None);

        assert!(profile.rationale.contains("재무 설문 없음"));
        assert!(profile.rationale.contains("moderate"));
        assert!(profile.rationale.ends_with("conservative"));
    }
}
