use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::Category;
use crate::classifier::{ClassificationResult, ScoredCategory, StrategyKind};

// --- Health ---

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub statistical_model_loaded: bool,
    pub llm_configured: bool,
    pub ocr_enabled: bool,
}

// --- Categories ---

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub category: Category,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryInfo>,
}

impl CategoriesResponse {
    pub fn registry() -> Self {
        Self {
            categories: Category::ALL
                .iter()
                .map(|c| CategoryInfo {
                    category: *c,
                    description: c.description().to_string(),
                })
                .collect(),
        }
    }
}

// --- Classification ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyTextRequest {
    pub text: String,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyBatchRequest {
    pub texts: Vec<String>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub request_id: Uuid,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub strategy: StrategyKind,
    pub is_confident: bool,
    pub all_scores: BTreeMap<Category, f64>,
    pub top_predictions: Vec<ScoredCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub used_ocr: bool,
    pub text_preview: String,
    pub classified_at: DateTime<Utc>,
}

impl From<ClassificationResult> for ClassifyResponse {
    fn from(r: ClassificationResult) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            category: r.category,
            confidence: r.confidence,
            strategy: r.strategy_used,
            is_confident: r.is_confident,
            all_scores: r.all_scores,
            top_predictions: r.top_predictions,
            reason: r.reason,
            used_ocr: r.used_ocr,
            text_preview: r.text_preview,
            classified_at: Utc::now(),
        }
    }
}

// --- Batch ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub total_processed: usize,
    pub successful_classifications: usize,
    pub failed_classifications: usize,
    /// Percentage of items that produced a result, rounded to two decimals.
    pub success_rate: f64,
    pub average_confidence: f64,
    pub confidence_range: ConfidenceRange,
    pub predictions_distribution: BTreeMap<Category, usize>,
}

impl BatchSummary {
    pub fn from_items(items: &[BatchItem]) -> Self {
        let results: Vec<&ClassificationResult> =
            items.iter().filter_map(|i| i.result.as_ref()).collect();
        let confidences: Vec<f64> = results.iter().filter_map(|r| r.confidence).collect();

        let mut predictions_distribution = BTreeMap::new();
        for r in &results {
            *predictions_distribution.entry(r.category).or_insert(0) += 1;
        }

        let total = items.len();
        let successful = results.len();
        let success_rate = if total == 0 {
            0.0
        } else {
            round_to(successful as f64 / total as f64 * 100.0, 2)
        };
        let average_confidence = if confidences.is_empty() {
            0.0
        } else {
            round_to(confidences.iter().sum::<f64>() / confidences.len() as f64, 3)
        };
        let confidence_range = ConfidenceRange {
            min: round_to(confidences.iter().copied().reduce(f64::min).unwrap_or(0.0), 3),
            max: round_to(confidences.iter().copied().reduce(f64::max).unwrap_or(0.0), 3),
        };

        Self {
            total_processed: total,
            successful_classifications: successful,
            failed_classifications: total - successful,
            success_rate,
            average_confidence,
            confidence_range,
            predictions_distribution,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
    pub summary: BatchSummary,
}

// --- Model info ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    pub classes: Vec<Category>,
    pub feature_count: usize,
}

// --- Errors ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(category: Category, confidence: f64) -> ClassificationResult {
        ClassificationResult {
            category,
            confidence: Some(confidence),
            strategy_used: StrategyKind::FewShot,
            is_confident: confidence >= 0.3,
            all_scores: BTreeMap::new(),
            top_predictions: Vec::new(),
            reason: None,
            used_ocr: false,
            text_preview: String::new(),
        }
    }

    #[test]
    fn batch_summary_counts_successes_and_failures() {
        let items = vec![
            BatchItem {
                index: 0,
                result: Some(result(Category::Vendor, 0.5)),
                error: None,
            },
            BatchItem {
                index: 1,
                result: None,
                error: Some("Invalid input: text is empty".into()),
            },
            BatchItem {
                index: 2,
                result: Some(result(Category::Vendor, 0.25)),
                error: None,
            },
            BatchItem {
                index: 3,
                result: Some(result(Category::Nda, 0.9)),
                error: None,
            },
        ];

        let summary = BatchSummary::from_items(&items);
        assert_eq!(summary.total_processed, 4);
        assert_eq!(summary.successful_classifications, 3);
        assert_eq!(summary.failed_classifications, 1);
        assert_eq!(summary.success_rate, 75.0);
        assert_eq!(summary.average_confidence, 0.55);
        assert_eq!(summary.confidence_range, ConfidenceRange { min: 0.25, max: 0.9 });
        assert_eq!(summary.predictions_distribution[&Category::Vendor], 2);
        assert_eq!(summary.predictions_distribution[&Category::Nda], 1);
    }

    #[test]
    fn batch_summary_of_nothing_is_zeroed() {
        let summary = BatchSummary::from_items(&[]);
        assert_eq!(summary.total_processed, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.average_confidence, 0.0);
        assert!(summary.predictions_distribution.is_empty());
    }

    #[test]
    fn categories_response_lists_registry_in_order() {
        let response = CategoriesResponse::registry();
        assert_eq!(response.categories.len(), 5);
        assert_eq!(response.categories[1].category, Category::Nda);
        assert_eq!(response.categories[1].description, "Non-Disclosure Agreements");
    }

    #[test]
    fn classify_request_defaults_optional_fields() {
        let req: ClassifyTextRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(req.text, "hello");
        assert!(req.confidence_threshold.is_none());
        assert!(req.top_n.is_none());
    }
}
