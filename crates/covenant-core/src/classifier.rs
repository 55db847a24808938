use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::{CovenantError, Result};

/// Selector for one of the three classification strategies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    #[serde(rename = "few-shot")]
    FewShot,
    #[serde(rename = "tf_logistic_regression")]
    Statistical,
    #[serde(rename = "llm")]
    Llm,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [Self::FewShot, Self::Statistical, Self::Llm];

    /// Route segment the strategy is served under.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::FewShot => "few-shot",
            Self::Statistical => "tf_logistic_regression",
            Self::Llm => "llm",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for StrategyKind {
    type Err = CovenantError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "few-shot" | "few_shot" | "fewshot" => Ok(Self::FewShot),
            "tf_logistic_regression" | "tf-logistic-regression" | "statistical" => {
                Ok(Self::Statistical)
            }
            "llm" => Ok(Self::Llm),
            other => Err(CovenantError::InvalidInput(format!(
                "unknown classification strategy: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoredCategory {
    pub category: Category,
    pub confidence: f64,
}

/// Raw, unvalidated output of a strategy. The label is free-form text until
/// the dispatcher runs it through the category registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutput {
    pub label: Option<String>,
    pub confidence: Option<f64>,
    pub scores: Vec<ScoredCategory>,
    pub reason: Option<String>,
}

impl StrategyOutput {
    /// Output for input the strategy cannot decide on.
    pub fn abstain() -> Self {
        Self {
            label: None,
            confidence: Some(0.0),
            scores: Vec::new(),
            reason: None,
        }
    }

    pub fn labelled(category: Category, confidence: f64, scores: Vec<ScoredCategory>) -> Self {
        Self {
            label: Some(category.as_str().to_string()),
            confidence: Some(confidence),
            scores,
            reason: None,
        }
    }
}

/// Validated classification of a single document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub strategy_used: StrategyKind,
    pub is_confident: bool,
    pub all_scores: BTreeMap<Category, f64>,
    pub top_predictions: Vec<ScoredCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub used_ocr: bool,
    pub text_preview: String,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    fn kind(&self) -> StrategyKind;
    async fn classify(&self, text: &str) -> Result<StrategyOutput>;
}
