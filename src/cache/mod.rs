pub mod catalog;
pub mod keys;
pub mod redis_tier;
pub mod shared;
pub mod tiered;

pub use catalog::CachedProductCatalog;
pub use keys::CacheKey;
pub use redis_tier::{RedisSharedCache, RedisTierConfig};
pub use shared::{CacheError, InMemorySharedCache, SharedCacheClient};
pub use tiered::{CacheMetrics, CacheStatus, TierSettings, TieredCache};
