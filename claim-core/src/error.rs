use thiserror::Error;

/// Errors produced by the claim-core library
#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ClaimError>;
