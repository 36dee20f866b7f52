//! Layers wrapped around every backend dispatch: response cache and rate limiting

pub mod cache;
pub mod rate_limit;

pub use cache::ResponseCache;
pub use rate_limit::RateLimiter;
