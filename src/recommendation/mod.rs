pub mod matcher;
pub mod suitability;

pub use matcher::{rank_products, RecommendationMatcher};
pub use suitability::{assess, Suitability};
