//! Gateway core - backend selection, orchestration and task wrappers

pub mod selector;
pub mod service;
pub mod tasks;

pub use selector::{BackendHealth, ModelSelector, SelectedBackend};
pub use service::{Gateway, GatewayStats};
pub use tasks::{Moderation, Quiz, ThreadMessage};
