pub mod behavior;
pub mod scorer;
pub mod service;

pub use behavior::aggregate;
pub use scorer::{classify, RiskProfileScorer, CONSERVATIVE_MAX, MODERATE_MAX};
pub use service::RiskProfileService;
