pub mod error;
pub mod extract;
pub mod models;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use error::{ClaimError, Result};
pub use extract::{
    BufferedReadStrategy, DirectBufferStrategy, ExtractStrategy, ExtractionPipeline,
    TempFileStrategy,
};
pub use models::{ClaimDraft, ClaimFile, ClaimRecord, ClaimSummary, Classification};
pub use session::{CLAIM_HISTORY_KEY, CURRENT_CLAIM_KEY, ClaimSession};
pub use storage::{InMemoryStorage, StoragePort};
