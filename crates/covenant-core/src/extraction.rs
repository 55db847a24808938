use async_trait::async_trait;

use crate::document::ExtractionOutcome;
use crate::error::Result;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Recover plain text from a PDF, falling back to OCR for image-based documents.
    async fn extract(&self, pdf_bytes: &[u8]) -> Result<ExtractionOutcome>;
}
