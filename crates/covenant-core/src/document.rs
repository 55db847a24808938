use serde::{Deserialize, Serialize};

/// Input accepted by the classification pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    RawText(String),
    PdfBytes(Vec<u8>),
}

impl Document {
    pub fn is_pdf(&self) -> bool {
        matches!(self, Self::PdfBytes(_))
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Self::RawText(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::RawText(text.to_string())
    }
}

/// Text recovered from a PDF, and how it was recovered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionOutcome {
    pub text: String,
    pub used_ocr: bool,
    pub page_count: usize,
}

/// Magic bytes every PDF container starts with (possibly after a few bytes
/// of leading garbage, which some generators emit).
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

/// First `max_chars` characters of `text`, with an ellipsis when truncated.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
