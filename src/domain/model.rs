use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 고객 식별자
pub type ClientId = i64;

/// 투자자 성향 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Conservative,
    Moderate,
    Aggressive,
}

impl Classification {
    /// 모든 분류 값. 캐시 무효화가 이 배열을 순회하므로 변형을 추가하면 반드시 여기에도 추가해야 함
    pub const ALL: [Classification; 3] = [
        Classification::Conservative,
        Classification::Moderate,
        Classification::Aggressive,
    ];

    /// 근접도 계산용 정수 순위 (1..=3)
    pub fn rank(self) -> u8 {
        match self {
            Classification::Conservative => 1,
            Classification::Moderate => 2,
            Classification::Aggressive => 3,
        }
    }

    /// 두 분류 사이의 거리
    pub fn distance(self, other: Classification) -> u8 {
        self.rank().abs_diff(other.rank())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Conservative => "conservative",
            Classification::Moderate => "moderate",
            Classification::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("알 수 없는 투자자 성향: {}", s))
    }
}

/// 상품 위험 등급
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("알 수 없는 위험 등급: {}", s))
    }
}

/// 상품 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Cdb,
    Lci,
    Lca,
    TesouroDireto,
    Fundo,
}

impl ProductType {
    pub const ALL: [ProductType; 5] = [
        ProductType::Cdb,
        ProductType::Lci,
        ProductType::Lca,
        ProductType::TesouroDireto,
        ProductType::Fundo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::Cdb => "cdb",
            ProductType::Lci => "lci",
            ProductType::Lca => "lca",
            ProductType::TesouroDireto => "tesouro_direto",
            ProductType::Fundo => "fundo",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = String;

    /// 대소문자, 공백, 하이픈, 밑줄 차이를 무시 ("Tesouro Direto" == "tesouro_direto")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|t| t.as_str().replace('_', "") == normalized)
            .ok_or_else(|| format!("알 수 없는 상품 유형: {}", s))
    }
}

/// 투자 기간
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    Short,
    Medium,
    Long,
}

/// 투자 목적
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    EmergencyReserve,
    HomePurchase,
    Retirement,
    Education,
    WealthGrowth,
}

/// 투자 상품 (카탈로그 원본 레코드)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub product_type: ProductType,
    /// 연 수익률 (0.13 = 13%)
    pub annual_yield: f64,
    pub risk_level: RiskLevel,
    pub min_term_days: u32,
    pub min_investment: f64,
    pub allows_early_withdrawal: bool,
    pub recommended_classification: Classification,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        product_type: ProductType,
        annual_yield: f64,
        risk_level: RiskLevel,
        min_term_days: u32,
        min_investment: f64,
        allows_early_withdrawal: bool,
        recommended_classification: Classification,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            product_type,
            annual_yield,
            risk_level,
            min_term_days,
            min_investment,
            allows_early_withdrawal,
            recommended_classification,
        }
    }
}

/// 카탈로그 조건 검색 필터
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductCriteria {
    /// 최소 투자금이 이 값 이하인 상품만
    pub max_min_investment: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub allows_early_withdrawal: Option<bool>,
}

impl ProductCriteria {
    pub fn matches(&self, product: &Product) -> bool {
        self.max_min_investment
            .map_or(true, |max| product.min_investment <= max)
            && self.risk_level.map_or(true, |r| product.risk_level == r)
            && self
                .allows_early_withdrawal
                .map_or(true, |l| product.allows_early_withdrawal == l)
    }
}

/// 고객
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
}

/// 재무 설문 (고객당 0..1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub client_id: ClientId,
    pub monthly_income: f64,
    pub net_worth: f64,
    pub active_debt: f64,
    pub dependents: u32,
    pub horizon: Horizon,
    pub objective: Objective,
    /// 손실 허용도 0..=10
    pub loss_tolerance: u8,
    pub has_experience: bool,
}

/// 과거 시뮬레이션 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub id: Uuid,
    pub client_id: ClientId,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_type: ProductType,
    pub risk_level: RiskLevel,
    pub allows_early_withdrawal: bool,
    pub amount: f64,
    pub final_amount: f64,
    pub term_months: u32,
    pub simulated_at: DateTime<Utc>,
}

/// 상품별 일별 시뮬레이션 집계
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDaySummary {
    pub product_id: Uuid,
    pub product_name: String,
    /// UTC 기준 날짜
    pub day: NaiveDate,
    pub simulation_count: u64,
    pub average_final_amount: f64,
}

/// 확정된 투자 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRecord {
    pub id: Uuid,
    pub client_id: ClientId,
    pub product_id: Uuid,
    pub product_type: ProductType,
    pub risk_level: RiskLevel,
    pub allows_early_withdrawal: bool,
    pub amount: f64,
    pub term_months: u32,
    pub applied_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

/// 고객의 전체 거래 이력
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientHistory {
    pub simulations: Vec<SimulationRecord>,
    pub investments: Vec<InvestmentRecord>,
}

impl ClientHistory {
    pub fn operation_count(&self) -> usize {
        self.simulations.len() + self.investments.len()
    }
}

/// 행동 기반 집계값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralAggregate {
    pub client_id: ClientId,
    pub total_volume: f64,
    pub recency_weighted_frequency: u32,
    pub liquidity_preference: bool,
    /// 참고용 관측 성향 (점수에는 반영되지 않음)
    pub observed_tendency: Option<Classification>,
}

impl BehavioralAggregate {
    pub fn new(
        client_id: ClientId,
        total_volume: f64,
        recency_weighted_frequency: u32,
        liquidity_preference: bool,
    ) -> Self {
        Self {
            client_id,
            total_volume,
            recency_weighted_frequency,
            liquidity_preference,
            observed_tendency: None,
        }
    }
}

/// 점수 항목별 내역
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub volume: i32,
    pub frequency: i32,
    pub liquidity: i32,
    pub net_worth_share: i32,
    pub loss_tolerance: i32,
    pub horizon: i32,
    pub experience: i32,
    /// 신규 고객 상한 적용으로 깎인 점수
    pub new_client_cap: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.volume
            + self.frequency
            + self.liquidity
            + self.net_worth_share
            + self.loss_tolerance
            + self.horizon
            + self.experience
            - self.new_client_cap
    }
}

/// 위험 성향 프로필. 항상 전체 재계산으로 생성됨
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub client_id: ClientId,
    pub score: i32,
    pub classification: Classification,
    pub rationale: String,
    pub breakdown: ScoreBreakdown,
    pub last_updated: DateTime<Utc>,
}
