//! Backend module - client trait and HTTP implementation

pub mod http_backend;
pub mod traits;

pub use http_backend::HttpBackendClient;
pub use traits::{BackendClient, GenerationRequest};
