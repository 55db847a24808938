//! TF-IDF + logistic regression strategy backed by an exported model artifact.
//!
//! The artifact is a JSON document holding the fitted vectorizer state and
//! the linear decision boundaries, one row of coefficients per class:
//!
//! ```json
//! {
//!   "classes": ["Employment Contracts", "Non-Disclosure Agreements", "..."],
//!   "vocabulary": {"salary": 0, "vendor": 1},
//!   "idf": [1.9, 2.3],
//!   "coef": [[3.1, -0.4], [-0.2, 2.8]],
//!   "intercept": [0.1, -0.1],
//!   "ngram_range": [1, 2],
//!   "sublinear_tf": false
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use covenant_core::category::{self, Category};
use covenant_core::classifier::{Classifier, ScoredCategory, StrategyKind, StrategyOutput};
use covenant_core::error::{CovenantError, Result};

use crate::text::{SparseVector, TfidfVectorizer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub classes: Vec<String>,
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub stop_words: Vec<String>,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

impl ModelArtifact {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CovenantError::ModelNotLoaded(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            CovenantError::ModelNotLoaded(format!("cannot parse {}: {e}", path.display()))
        })
    }

    fn check_shapes(&self) -> Result<()> {
        let features = self.idf.len();
        let invalid = |msg: String| Err(CovenantError::ModelNotLoaded(msg));

        if self.classes.len() < 2 {
            return invalid("model must have at least two classes".into());
        }
        if self.vocabulary.values().any(|&col| col >= features) {
            return invalid(format!("vocabulary column out of range for {features} features"));
        }
        // Binary models export a single decision row for the positive class.
        let rows_ok = match self.classes.len() {
            2 => matches!(self.coef.len(), 1 | 2),
            n => self.coef.len() == n,
        };
        if !rows_ok || self.coef.len() != self.intercept.len() {
            return invalid(format!(
                "coefficient shape {}x? does not match {} classes / {} intercepts",
                self.coef.len(),
                self.classes.len(),
                self.intercept.len()
            ));
        }
        if let Some(row) = self.coef.iter().find(|row| row.len() != features) {
            return invalid(format!(
                "coefficient row has {} columns, expected {features}",
                row.len()
            ));
        }
        if self.ngram_range.0 == 0 || self.ngram_range.0 > self.ngram_range.1 {
            return invalid(format!("invalid ngram_range {:?}", self.ngram_range));
        }
        Ok(())
    }
}

/// A validated, ready-to-score model. Immutable once built; share it as
/// `Arc<StatisticalModel>`.
#[derive(Debug)]
pub struct StatisticalModel {
    source: Option<PathBuf>,
    classes: Vec<Category>,
    vectorizer: TfidfVectorizer,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

impl StatisticalModel {
    pub fn load(path: &Path) -> Result<Self> {
        let artifact = ModelArtifact::from_file(path)?;
        let mut model = Self::from_artifact(artifact)?;
        model.source = Some(path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            classes = ?model.classes,
            features = model.feature_count(),
            "Statistical model loaded"
        );
        Ok(model)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        artifact.check_shapes()?;

        let classes = artifact
            .classes
            .iter()
            .map(|label| {
                category::validate(label).map_err(|_| {
                    CovenantError::ModelNotLoaded(format!(
                        "model class {label:?} is not a supported category"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let vectorizer = TfidfVectorizer::from_parts(
            artifact.vocabulary,
            artifact.idf,
            artifact.stop_words,
            artifact.ngram_range,
            artifact.sublinear_tf,
        );

        Ok(Self {
            source: None,
            classes,
            vectorizer,
            coef: artifact.coef,
            intercept: artifact.intercept,
        })
    }

    pub fn classes(&self) -> &[Category] {
        &self.classes
    }

    pub fn feature_count(&self) -> usize {
        self.vectorizer.feature_count()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn decision(&self, row: usize, x: &SparseVector) -> f64 {
        let weights = &self.coef[row];
        self.intercept[row] + x.iter().map(|(&col, v)| weights[col] * v).sum::<f64>()
    }

    /// Class probabilities, in the model's class order.
    pub fn predict_proba(&self, text: &str) -> Vec<f64> {
        let x = self.vectorizer.transform(&preprocess(text));

        if self.coef.len() == 1 {
            let p = sigmoid(self.decision(0, &x));
            return vec![1.0 - p, p];
        }

        let logits: Vec<f64> = (0..self.coef.len()).map(|row| self.decision(row, &x)).collect();
        softmax(&logits)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

const LEGAL_ABBREVIATIONS: &[(&str, &str)] = &[
    ("w/o", "without"),
    ("w/", "with"),
    ("&", " and "),
    ("inc.", "incorporated"),
    ("ltd.", "limited"),
    ("corp.", "corporation"),
];

/// Normalize contract text before vectorizing: lowercase, expand common
/// legal abbreviations, strip punctuation (hyphens survive), collapse spaces.
pub fn preprocess(text: &str) -> String {
    let mut text = text.to_lowercase();
    for (abbrev, full) in LEGAL_ABBREVIATIONS {
        text = text.replace(abbrev, full);
    }

    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .filter(|w| !w.is_empty())
        .map(|w| if w == "llc" { "limited liability company" } else { w })
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct StatisticalClassifier {
    model: Arc<StatisticalModel>,
}

impl StatisticalClassifier {
    pub fn new(model: Arc<StatisticalModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Classifier for StatisticalClassifier {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Statistical
    }

    async fn classify(&self, text: &str) -> Result<StrategyOutput> {
        if text.trim().is_empty() {
            return Ok(StrategyOutput::abstain());
        }

        let probabilities = self.model.predict_proba(text);
        let scores: Vec<ScoredCategory> = self
            .model
            .classes
            .iter()
            .zip(&probabilities)
            .map(|(category, p)| ScoredCategory {
                category: *category,
                confidence: *p,
            })
            .collect();

        let best = scores
            .iter()
            .copied()
            .fold(None::<ScoredCategory>, |best, s| match best {
                Some(b) if b.confidence >= s.confidence => Some(b),
                _ => Some(s),
            })
            .ok_or_else(|| CovenantError::Internal("model produced no scores".into()))?;

        tracing::debug!(
            category = %best.category,
            confidence = best.confidence,
            "Statistical prediction"
        );

        Ok(StrategyOutput::labelled(best.category, best.confidence, scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ModelArtifact {
        let terms = ["salary", "employee", "confidential", "vendor", "goods"];
        ModelArtifact {
            classes: vec![
                "Employment Contracts".into(),
                "Non-Disclosure Agreements".into(),
                "Vendor Agreements".into(),
            ],
            vocabulary: terms.iter().enumerate().map(|(i, t)| (t.to_string(), i)).collect(),
            idf: vec![1.5; 5],
            coef: vec![
                vec![4.0, 4.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.0, 4.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0, 4.0, 4.0],
            ],
            intercept: vec![0.0, 0.0, 0.0],
            ngram_range: (1, 1),
            sublinear_tf: false,
            stop_words: Vec::new(),
        }
    }

    fn classifier() -> StatisticalClassifier {
        StatisticalClassifier::new(Arc::new(StatisticalModel::from_artifact(artifact()).unwrap()))
    }

    #[test]
    fn preprocess_expands_abbreviations_and_strips_punctuation() {
        assert_eq!(
            preprocess("Acme Corp. & Widgets LLC, w/o   notice!"),
            "acme corporation and widgets limited liability company without notice"
        );
    }

    #[test]
    fn probabilities_sum_to_one() {
        let model = StatisticalModel::from_artifact(artifact()).unwrap();
        let p = model.predict_proba("employee salary and vendor goods");
        assert_eq!(p.len(), 3);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn picks_highest_probability_class() {
        let out = classifier()
            .classify("The employee shall receive a salary.")
            .await
            .unwrap();
        assert_eq!(out.label.as_deref(), Some("Employment"));
        assert!(out.confidence.unwrap() > 0.5);
        assert_eq!(out.scores.len(), 3);
    }

    #[tokio::test]
    async fn repeated_calls_are_identical() {
        let c = classifier();
        let a = c.classify("confidential information").await.unwrap();
        let b = c.classify("confidential information").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn empty_input_abstains() {
        let out = classifier().classify("").await.unwrap();
        assert!(out.label.is_none());
    }

    #[test]
    fn rejects_unknown_class_names() {
        let mut bad = artifact();
        bad.classes[2] = "Lease Agreements".into();
        assert!(matches!(
            StatisticalModel::from_artifact(bad),
            Err(CovenantError::ModelNotLoaded(_))
        ));
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let mut bad = artifact();
        bad.coef[1].pop();
        assert!(StatisticalModel::from_artifact(bad).is_err());

        let mut bad = artifact();
        bad.vocabulary.insert("extra".into(), 99);
        assert!(StatisticalModel::from_artifact(bad).is_err());
    }

    #[test]
    fn binary_model_uses_single_decision_row() {
        let model = StatisticalModel::from_artifact(ModelArtifact {
            classes: vec!["NDA".into(), "Vendor".into()],
            vocabulary: [("vendor".to_string(), 0)].into_iter().collect(),
            idf: vec![1.0],
            coef: vec![vec![5.0]],
            intercept: vec![0.0],
            ngram_range: (1, 1),
            sublinear_tf: false,
            stop_words: Vec::new(),
        })
        .unwrap();
        let p = model.predict_proba("vendor");
        assert!(p[1] > 0.99);
        assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_file_is_model_not_loaded() {
        let err = StatisticalModel::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, CovenantError::ModelNotLoaded(_)));
    }

    #[test]
    fn loads_artifact_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, serde_json::to_string(&artifact()).unwrap()).unwrap();

        let model = StatisticalModel::load(&path).unwrap();
        assert_eq!(model.classes(), &[Category::Employment, Category::Nda, Category::Vendor]);
        assert_eq!(model.feature_count(), 5);
        assert_eq!(model.source(), Some(path.as_path()));
    }
}
