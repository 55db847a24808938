use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CovenantError, Result};

pub const DEFAULT_LLM_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_LLM_MODEL: &str = "claude-haiku-4-5-20251001";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_input_chars: usize,
    pub max_tokens: u32,
}

impl LlmConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_LLM_API_URL.into(),
            model: DEFAULT_LLM_MODEL.into(),
            timeout_secs: 30,
            max_input_chars: 4000,
            max_tokens: 150,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    pub enabled: bool,
    pub language: String,
    pub dpi: u32,
    pub timeout_secs: u64,
    /// Below this many non-whitespace characters the whole PDF is OCR'd.
    pub min_total_chars: usize,
    /// Below this average per page the whole PDF is OCR'd.
    pub min_chars_per_page: usize,
    pub pdftoppm_bin: String,
    pub tesseract_bin: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "eng".into(),
            dpi: 300,
            timeout_secs: 120,
            min_total_chars: 32,
            min_chars_per_page: 16,
            pdftoppm_bin: "pdftoppm".into(),
            tesseract_bin: "tesseract".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub model_path: PathBuf,
    /// Refuse to start when the statistical model cannot be loaded.
    pub require_model: bool,
    pub min_text_chars: usize,
    pub confidence_threshold: f64,
    pub top_n: usize,
    pub max_upload_bytes: usize,
    /// Batch items classified at once; bounds concurrent provider calls.
    pub batch_concurrency: usize,
    pub llm: LlmConfig,
    pub ocr: OcrConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".into(),
            server_port: 8000,
            model_path: PathBuf::from("models/contract_classifier.json"),
            require_model: false,
            min_text_chars: 10,
            confidence_threshold: 0.3,
            top_n: 3,
            max_upload_bytes: 20 * 1024 * 1024,
            batch_concurrency: 4,
            llm: LlmConfig::default(),
            ocr: OcrConfig::default(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let llm_defaults = LlmConfig::default();
        let ocr_defaults = OcrConfig::default();

        Self {
            server_host: env_string("SERVER_HOST", &defaults.server_host),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            require_model: env_or("REQUIRE_MODEL", defaults.require_model),
            min_text_chars: env_or("MIN_TEXT_CHARS", defaults.min_text_chars),
            confidence_threshold: env_or("CONFIDENCE_THRESHOLD", defaults.confidence_threshold),
            top_n: env_or("TOP_N", defaults.top_n),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            batch_concurrency: env_or("BATCH_CONCURRENCY", defaults.batch_concurrency),
            llm: LlmConfig {
                api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
                api_url: env_string("LLM_API_URL", &llm_defaults.api_url),
                model: env_string("LLM_MODEL", &llm_defaults.model),
                timeout_secs: env_or("LLM_TIMEOUT_SECS", llm_defaults.timeout_secs),
                max_input_chars: env_or("LLM_MAX_INPUT_CHARS", llm_defaults.max_input_chars),
                max_tokens: env_or("LLM_MAX_TOKENS", llm_defaults.max_tokens),
            },
            ocr: OcrConfig {
                enabled: env_or("OCR_ENABLED", ocr_defaults.enabled),
                language: env_string("OCR_LANGUAGE", &ocr_defaults.language),
                dpi: env_or("OCR_DPI", ocr_defaults.dpi),
                timeout_secs: env_or("OCR_TIMEOUT_SECS", ocr_defaults.timeout_secs),
                min_total_chars: env_or("OCR_MIN_TOTAL_CHARS", ocr_defaults.min_total_chars),
                min_chars_per_page: env_or(
                    "OCR_MIN_CHARS_PER_PAGE",
                    ocr_defaults.min_chars_per_page,
                ),
                pdftoppm_bin: env_string("PDFTOPPM_BIN", &ocr_defaults.pdftoppm_bin),
                tesseract_bin: env_string("TESSERACT_BIN", &ocr_defaults.tesseract_bin),
            },
        }
    }

    /// Load a `.env` file if present, then read the environment.
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(CovenantError::Config(format!("failed to read .env: {e}")));
            }
        }
        let config = Self::from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(CovenantError::Config(format!(
                "CONFIDENCE_THRESHOLD must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.top_n == 0 {
            return Err(CovenantError::Config("TOP_N must be at least 1".into()));
        }
        if self.batch_concurrency == 0 {
            return Err(CovenantError::Config(
                "BATCH_CONCURRENCY must be at least 1".into(),
            ));
        }
        if self.llm.max_input_chars == 0 {
            return Err(CovenantError::Config(
                "LLM_MAX_INPUT_CHARS must be at least 1".into(),
            ));
        }
        if self.ocr.dpi == 0 {
            return Err(CovenantError::Config("OCR_DPI must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.llm.max_input_chars, 4000);
        assert!(config.ocr.enabled);
        assert!(!config.llm.is_configured());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let config = AppConfig {
            confidence_threshold: 1.5,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(CovenantError::Config(_))));
    }

    #[test]
    fn rejects_zero_top_n() {
        let config = AppConfig {
            top_n: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_batch_concurrency() {
        let config = AppConfig {
            batch_concurrency: 0,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(CovenantError::Config(_))));
    }
}
