//! Completion Gateway
//!
//! A single choke point for text generation: picks a working model among
//! configured candidates, memoizes responses, spaces outbound calls, and
//! recovers structured data from noisy model output with typed fallbacks.

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod response;

pub use error::{AppError, BackendError, ParseError, Result};
pub use gateway::{Gateway, GatewayStats, Moderation, Quiz, ThreadMessage};
