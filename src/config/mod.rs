//! Configuration loading and prompt templates

pub mod prompts;
pub mod settings;

pub use prompts::PromptTemplates;
pub use settings::{
    BackendConfig, CacheConfig, LoggingConfig, RateLimitConfig, SelectionConfig, Settings,
};
