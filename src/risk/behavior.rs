//! 거래 이력 → 행동 기반 집계
//!
//! 시뮬레이션과 확정 투자 이력에서 거래량, 최근 빈도, 유동성 선호, 관측 성향을 계산합니다.
//! 기준 시각(`now`)을 인자로 받으므로 같은 입력이면 항상 같은 결과를 냅니다.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{BehavioralAggregate, Classification, ClientHistory, ClientId, RiskLevel};

/// 빈도 집계 구간 (일)
pub const FREQUENCY_WINDOW_DAYS: i64 = 365;
/// 확정 투자의 빈도 가중치
pub const INVESTMENT_FREQUENCY_WEIGHT: u32 = 2;
/// 유동성 선호로 판단하는 최소 비율
pub const LIQUIDITY_PREFERENCE_RATIO: f64 = 0.55;

const SHORT_TERM_MONTHS: u32 = 12;

/// 이력 전체를 집계
pub fn aggregate(client_id: ClientId, history: &ClientHistory, now: DateTime<Utc>) -> BehavioralAggregate {
    let mut aggregate = BehavioralAggregate::new(
        client_id,
        total_volume(history),
        recency_weighted_frequency(history, now),
        prefers_liquidity(history),
    );
    aggregate.observed_tendency = observed_tendency(history);
    aggregate
}

/// 시뮬레이션 금액과 확정 투자 금액의 합 (기간 제한 없음)
pub fn total_volume(history: &ClientHistory) -> f64 {
    let simulated: f64 = history.simulations.iter().map(|s| s.amount).sum();
    let invested: f64 = history.investments.iter().map(|i| i.amount).sum();
    simulated + invested
}

/// 최근 12개월 시뮬레이션 수 + 2 × 최근 12개월 확정 투자 수
pub fn recency_weighted_frequency(history: &ClientHistory, now: DateTime<Utc>) -> u32 {
    let cutoff = now - Duration::days(FREQUENCY_WINDOW_DAYS);
    let recent = |at: DateTime<Utc>| at >= cutoff && at <= now;

    let simulations = history.simulations.iter().filter(|s| recent(s.simulated_at)).count() as u32;
    let investments = history.investments.iter().filter(|i| recent(i.applied_at)).count() as u32;

    simulations + INVESTMENT_FREQUENCY_WEIGHT * investments
}

/// 유동성 점수를 이론적 최대치로 나눈 비율
///
/// 이력이 없으면 `None`
pub fn liquidity_ratio(history: &ClientHistory) -> Option<f64> {
    let mut score = 0.0;

    for simulation in &history.simulations {
        if simulation.allows_early_withdrawal {
            score += 1.0;
        }
        if simulation.term_months <= SHORT_TERM_MONTHS {
            score += 0.5;
        }
    }

    for investment in &history.investments {
        if investment.allows_early_withdrawal {
            score += 3.0;
        }
        let redeemed_early = investment
            .redeemed_at
            .map_or(false, |redeemed| redeemed - investment.applied_at <= Duration::days(365));
        if investment.term_months <= SHORT_TERM_MONTHS || redeemed_early {
            score += 1.0;
        }
    }

    let max = 1.5 * history.simulations.len() as f64 + 4.0 * history.investments.len() as f64;
    (max > 0.0).then(|| score / max)
}

/// 이력이 없는 고객은 유동성 선호로 간주
pub fn prefers_liquidity(history: &ClientHistory) -> bool {
    liquidity_ratio(history).map_or(true, |ratio| ratio >= LIQUIDITY_PREFERENCE_RATIO)
}

/// 실제 선택한 상품의 위험도로 본 성향 (참고용)
pub fn observed_tendency(history: &ClientHistory) -> Option<Classification> {
    let operations = history.operation_count();
    if operations == 0 {
        return None;
    }

    let simulated: u32 = history.simulations.iter().map(|s| risk_points(s.risk_level)).sum();
    let invested: u32 = history.investments.iter().map(|i| 2 * risk_points(i.risk_level)).sum();

    let simulated_types: HashSet<_> = history.simulations.iter().map(|s| s.product_type).collect();
    let invested_types: HashSet<_> = history.investments.iter().map(|i| i.product_type).collect();
    let diversity = 2 * (simulated_types.len() + invested_types.len()) as u32;

    // 정수 평균 (소수점 이하 버림)
    let average = (simulated + invested + diversity) / operations as u32;
    Some(if average <= 2 {
        Classification::Conservative
    } else if average <= 4 {
        Classification::Moderate
    } else {
        Classification::Aggressive
    })
}

fn risk_points(level: RiskLevel) -> u32 {
    match level {
        RiskLevel::Low => 1,
        RiskLevel::Medium => 2,
        RiskLevel::High => 3,
    }
}
