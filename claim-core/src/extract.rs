use anyhow::anyhow;
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use crate::error::{ClaimError, Result};
use crate::models::ClaimFile;

/// One way of turning the uploaded document into per-page text.
///
/// All strategies wrap the same underlying parser; they differ only in how
/// the bytes reach it. Pages are returned in ascending page order.
#[async_trait]
pub trait ExtractStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn extract(&self, file: &ClaimFile) -> anyhow::Result<Vec<String>>;
}

/// Ordered fallback chain over the extraction strategies.
///
/// Strategies run in fixed order; the first success short-circuits the rest.
/// A strategy is never retried. When every strategy fails, the failure
/// messages are concatenated in strategy order so the caller can see which
/// layer broke.
pub struct ExtractionPipeline {
    strategies: Vec<Arc<dyn ExtractStrategy>>,
}

impl ExtractionPipeline {
    pub fn new(strategies: Vec<Arc<dyn ExtractStrategy>>) -> Self {
        Self { strategies }
    }

    /// The production chain: direct buffer parse, buffered-read indirection,
    /// then a temporary file handle.
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(DirectBufferStrategy),
            Arc::new(BufferedReadStrategy),
            Arc::new(TempFileStrategy),
        ])
    }

    /// Extract the document text, joining pages with a double line break in
    /// page order.
    pub async fn extract_text(&self, file: &ClaimFile) -> Result<String> {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            match strategy.extract(file).await {
                Ok(pages) => {
                    info!(
                        strategy = strategy.name(),
                        pages = pages.len(),
                        file = %file.name,
                        "Extraction strategy succeeded"
                    );
                    return Ok(pages.join("\n\n"));
                }
                Err(e) => {
                    warn!(
                        strategy = strategy.name(),
                        error = %e,
                        file = %file.name,
                        "Extraction strategy failed, falling through"
                    );
                    failures.push(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        Err(ClaimError::Extraction(failures.join("; ")))
    }
}

/// Strategy 1: feed the full in-memory byte buffer directly to the parser
pub struct DirectBufferStrategy;

#[async_trait]
impl ExtractStrategy for DirectBufferStrategy {
    fn name(&self) -> &'static str {
        "direct-buffer"
    }

    async fn extract(&self, file: &ClaimFile) -> anyhow::Result<Vec<String>> {
        let bytes = file.bytes.clone();
        parse_buffer(bytes).await
    }
}

/// Strategy 2: re-read the bytes through an asynchronous reader into a fresh
/// buffer before handing them to the same parser
pub struct BufferedReadStrategy;

#[async_trait]
impl ExtractStrategy for BufferedReadStrategy {
    fn name(&self) -> &'static str {
        "buffered-read"
    }

    async fn extract(&self, file: &ClaimFile) -> anyhow::Result<Vec<String>> {
        let mut reader = tokio::io::BufReader::new(file.bytes.as_slice());
        let mut buffer = Vec::with_capacity(file.bytes.len());
        reader
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| anyhow!("failed to re-read document bytes: {}", e))?;

        parse_buffer(buffer).await
    }
}

/// Strategy 3: spill the bytes to a temporary file and parse by path. The
/// temporary file is released exactly once, on success or failure.
pub struct TempFileStrategy;

#[async_trait]
impl ExtractStrategy for TempFileStrategy {
    fn name(&self) -> &'static str {
        "temp-file"
    }

    async fn extract(&self, file: &ClaimFile) -> anyhow::Result<Vec<String>> {
        let bytes = file.bytes.clone();

        tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<String>> {
            let mut temp = NamedTempFile::new()
                .map_err(|e| anyhow!("failed to create temporary file: {}", e))?;
            temp.write_all(&bytes)
                .map_err(|e| anyhow!("failed to write temporary file: {}", e))?;
            temp.flush()
                .map_err(|e| anyhow!("failed to flush temporary file: {}", e))?;

            let parsed = pdf_extract::extract_text_by_pages(temp.path());

            // close() consumes the handle, so the release happens once no
            // matter how the parse went
            let released = temp.close();

            let pages =
                parsed.map_err(|e| anyhow!("failed to parse document from temporary file: {}", e))?;
            released.map_err(|e| anyhow!("failed to release temporary file: {}", e))?;
            Ok(pages)
        })
        .await?
    }
}

/// Parse a byte buffer into per-page text on a blocking worker, since the
/// parser is synchronous.
async fn parse_buffer(bytes: Vec<u8>) -> anyhow::Result<Vec<String>> {
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| anyhow!("failed to parse document buffer: {}", e))
    })
    .await?
}
