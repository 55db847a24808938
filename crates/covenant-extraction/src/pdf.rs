use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use covenant_core::config::OcrConfig;
use covenant_core::document::{has_pdf_magic, ExtractionOutcome};
use covenant_core::error::{CovenantError, Result};
use covenant_core::extraction::TextExtractor;

use crate::ocr::{OcrEngine, TesseractOcr};

/// Decides whether a PDF's text layer is too sparse to trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionPolicy {
    pub min_total_chars: usize,
    pub min_chars_per_page: usize,
}

impl ExtractionPolicy {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            min_total_chars: config.min_total_chars,
            min_chars_per_page: config.min_chars_per_page,
        }
    }

    /// True when the document should be treated as image-based.
    ///
    /// The decision is made once for the whole document: a PDF mixing
    /// scanned and digital pages is either OCR'd entirely or not at all.
    pub fn needs_ocr(&self, pages: &[String]) -> bool {
        let total: usize = pages.iter().map(|p| significant_chars(p)).sum();
        if total < self.min_total_chars {
            return true;
        }
        total / pages.len().max(1) < self.min_chars_per_page
    }
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self::from_config(&OcrConfig::default())
    }
}

fn significant_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Two-tier PDF text extraction: the embedded text layer first, OCR only
/// when [`ExtractionPolicy::needs_ocr`] says the layer is unusable.
pub struct PdfTextExtractor {
    policy: ExtractionPolicy,
    ocr: Option<Arc<dyn OcrEngine>>,
    ocr_timeout: Duration,
}

impl PdfTextExtractor {
    pub fn new(
        policy: ExtractionPolicy,
        ocr: Option<Arc<dyn OcrEngine>>,
        ocr_timeout: Duration,
    ) -> Self {
        Self {
            policy,
            ocr,
            ocr_timeout,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        let ocr: Option<Arc<dyn OcrEngine>> = if config.enabled {
            Some(Arc::new(TesseractOcr::new(config)))
        } else {
            None
        };
        Self::new(
            ExtractionPolicy::from_config(config),
            ocr,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Per-page text layer. Parsing is CPU-bound and the parser may panic on
    /// malformed input, so it runs on the blocking pool.
    async fn extract_text_layer(pdf_bytes: Vec<u8>) -> Result<Vec<String>> {
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&pdf_bytes))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    CovenantError::UnreadablePdf("PDF parser rejected the document".into())
                } else {
                    CovenantError::Internal(format!("PDF extraction task failed: {e}"))
                }
            })?
            .map_err(|e| CovenantError::UnreadablePdf(e.to_string()))
    }

    fn text_layer_outcome(text: String, page_count: usize) -> ExtractionOutcome {
        ExtractionOutcome {
            text,
            used_ocr: false,
            page_count,
        }
    }

    async fn run_ocr(&self, pdf_bytes: &[u8]) -> Result<String> {
        let engine = self.ocr.as_ref().ok_or_else(|| {
            CovenantError::OcrUnavailable(
                "the PDF has no usable text layer and OCR is disabled".into(),
            )
        })?;

        tracing::info!(
            engine = engine.name(),
            timeout_secs = self.ocr_timeout.as_secs(),
            "Running OCR over the whole document"
        );

        tokio::time::timeout(self.ocr_timeout, engine.recognize(pdf_bytes))
            .await
            .map_err(|_| {
                CovenantError::Timeout(format!(
                    "OCR did not finish within {}s",
                    self.ocr_timeout.as_secs()
                ))
            })?
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, pdf_bytes: &[u8]) -> Result<ExtractionOutcome> {
        if !has_pdf_magic(pdf_bytes) {
            return Err(CovenantError::UnreadablePdf(
                "input does not start with a %PDF- header".into(),
            ));
        }

        let pages = Self::extract_text_layer(pdf_bytes.to_vec()).await?;
        let page_count = pages.len();

        if !self.policy.needs_ocr(&pages) {
            let text = join_pages(&pages);
            tracing::info!(
                pages = page_count,
                chars = text.len(),
                "Extracted PDF text layer"
            );
            return Ok(Self::text_layer_outcome(text, page_count));
        }

        tracing::info!(
            pages = page_count,
            "PDF text layer is too sparse, treating document as scanned"
        );

        let layer = join_pages(&pages);
        let text = match self.run_ocr(pdf_bytes).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) if !layer.is_empty() => {
                tracing::warn!("OCR produced no text, using the sparse text layer");
                return Ok(Self::text_layer_outcome(layer, page_count));
            }
            Err(
                e @ (CovenantError::OcrUnavailable(_)
                | CovenantError::Ocr(_)
                | CovenantError::Timeout(_)),
            ) if !layer.is_empty() => {
                tracing::warn!(error = %e, "OCR failed, using the sparse text layer");
                return Ok(Self::text_layer_outcome(layer, page_count));
            }
            Ok(_) => {
                return Err(CovenantError::InvalidInput(
                    "no text could be extracted from the PDF, even with OCR".into(),
                ))
            }
            Err(e) => return Err(e),
        };

        tracing::info!(pages = page_count, chars = text.len(), "OCR extraction complete");

        Ok(ExtractionOutcome {
            text,
            used_ocr: true,
            page_count,
        })
    }
}
