pub mod llm;
pub mod models;
pub mod service;

pub use llm::{LlmClient, LlmError, fallback_classification};
pub use service::{AppState, build_router, create_app};
