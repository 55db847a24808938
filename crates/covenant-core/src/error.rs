use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovenantError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unreadable PDF: {0}")]
    UnreadablePdf(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Statistical model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Upstream model provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream model provider rate limited the request")]
    UpstreamRateLimited { retry_after_secs: Option<u64> },

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CovenantError {
    /// Stable snake_case identifier exposed to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
            Self::InvalidInput(_) => "invalid_input",
            Self::UnreadablePdf(_) => "unreadable_pdf",
            Self::UnsupportedFileType(_) => "unsupported_file_type",
            Self::UnknownCategory(_) => "unknown_category",
            Self::ModelNotLoaded(_) => "model_not_loaded",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::UpstreamRateLimited { .. } => "upstream_rate_limited",
            Self::OcrUnavailable(_) => "ocr_unavailable",
            Self::Ocr(_) => "ocr_failed",
            Self::Timeout(_) => "timeout",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Errors caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::UnreadablePdf(_) | Self::UnsupportedFileType(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CovenantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_unavailable_are_distinguishable() {
        let limited = CovenantError::UpstreamRateLimited {
            retry_after_secs: Some(20),
        };
        let down = CovenantError::UpstreamUnavailable("connection reset".into());
        assert_ne!(limited.code(), down.code());
        assert!(!limited.is_client_error());
        assert!(!down.is_client_error());
    }

    #[test]
    fn input_errors_are_client_errors() {
        assert!(CovenantError::InvalidInput("empty".into()).is_client_error());
        assert!(CovenantError::UnreadablePdf("bad xref".into()).is_client_error());
        assert!(CovenantError::UnsupportedFileType("image/png".into()).is_client_error());
        assert!(!CovenantError::ModelNotLoaded("missing".into()).is_client_error());
    }
}
