pub mod api_types;
pub mod category;
pub mod classifier;
pub mod config;
pub mod document;
pub mod error;
pub mod extraction;

pub use category::Category;
pub use classifier::{
    ClassificationResult, Classifier, ScoredCategory, StrategyKind, StrategyOutput,
};
pub use config::{AppConfig, LlmConfig, OcrConfig};
pub use document::{Document, ExtractionOutcome};
pub use error::{CovenantError, Result};
pub use extraction::TextExtractor;
