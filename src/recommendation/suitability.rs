use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Classification, RiskLevel};

/// 상품 위험도와 투자자 성향의 적합성
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suitability {
    /// 프로필이 없어 판단하지 않음
    NotAssessed,
    Suitable,
    /// 성향보다 위험이 낮은 상품
    UnsuitableLowRisk,
    /// 성향보다 위험이 높은 상품
    UnsuitableHighRisk,
}

impl Suitability {
    pub fn is_suitable(self) -> bool {
        matches!(self, Suitability::Suitable)
    }

    pub fn message(self) -> &'static str {
        match self {
            Suitability::NotAssessed => "투자자 성향이 아직 평가되지 않았습니다",
            Suitability::Suitable => "투자자 성향에 적합한 상품입니다",
            Suitability::UnsuitableLowRisk => "투자자 성향에 비해 보수적인 상품입니다",
            Suitability::UnsuitableHighRisk => "투자자 성향에 비해 위험이 높은 상품입니다",
        }
    }
}

impl fmt::Display for Suitability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// 적합성 판정
pub fn assess(risk_level: RiskLevel, classification: Option<Classification>) -> Suitability {
    let Some(classification) = classification else {
        return Suitability::NotAssessed;
    };

    match (risk_level, classification) {
        (RiskLevel::Low, Classification::Conservative)
        | (RiskLevel::Medium, Classification::Moderate)
        | (RiskLevel::Medium, Classification::Aggressive)
        | (RiskLevel::High, Classification::Aggressive) => Suitability::Suitable,
        (RiskLevel::Low, Classification::Moderate | Classification::Aggressive) => Suitability::UnsuitableLowRisk,
        (RiskLevel::Medium | RiskLevel::High, Classification::Conservative)
        | (RiskLevel::High, Classification::Moderate) => Suitability::UnsuitableHighRisk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix() {
        use Classification::*;

        let expected = [
            (RiskLevel::Low, Conservative, Suitability::Suitable),
            (RiskLevel::Low, Moderate, Suitability::UnsuitableLowRisk),
            (RiskLevel::Low, Aggressive, Suitability::UnsuitableLowRisk),
            (RiskLevel::Medium, Conservative, Suitability::UnsuitableHighRisk),
            (RiskLevel::Medium, Moderate, Suitability::Suitable),
            (RiskLevel::Medium, Aggressive, Suitability::Suitable),
            (RiskLevel::High, Conservative, Suitability::UnsuitableHighRisk),
            (RiskLevel::High, Moderate, Suitability::UnsuitableHighRisk),
            (RiskLevel::High, Aggressive, Suitability::Suitable),
        ];

        for (risk, classification, suitability) in expected {
            assert_eq!(assess(risk, Some(classification)), suitability, "{:?}/{:?}", risk, classification);
        }
    }

    #[test]
    fn test_without_profile() {
        for risk in RiskLevel::ALL {
            assert_eq!(assess(risk, None), Suitability::NotAssessed);
        }
    }
}
