//! Response normalization for free-text and structured tasks

pub mod parser;

pub use parser::{to_structured, to_text, try_structured};
