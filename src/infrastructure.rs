//! Infrastructure layer for caching, rate limiting, configuration, and the
//! two retrieval backend adapters.

pub mod cache;
pub mod catalog_search;
pub mod config;
pub mod embedding;
pub mod logging;
pub mod rate_limiter;
pub mod web_search;

// Re-export commonly used items
pub use cache::{CacheKeyBuilder, TtlCache};
pub use catalog_search::{CatalogSearch, CatalogSearchAdapter, CatalogSearchConfig, HttpVectorIndex, VectorIndex};
pub use config::{AppConfig, ConfigManager};
pub use embedding::{HttpEmbeddingClient, QueryEmbedder};
pub use logging::init_logging;
pub use rate_limiter::SlidingWindowRateLimiter;
pub use web_search::{ShoppingSearchClient, WebSearch};
