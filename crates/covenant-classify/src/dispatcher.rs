use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use covenant_core::api_types::BatchItem;
use covenant_core::category::{self, Category};
use covenant_core::classifier::{
    ClassificationResult, Classifier, ScoredCategory, StrategyKind, StrategyOutput,
};
use covenant_core::document::{preview, Document};
use covenant_core::error::{CovenantError, Result};
use covenant_core::extraction::TextExtractor;
use covenant_core::AppConfig;

use crate::few_shot::FewShotMatcher;

const PREVIEW_CHARS: usize = 200;
const DEFAULT_BATCH_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchOptions {
    pub confidence_threshold: f64,
    pub top_n: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            top_n: 3,
        }
    }
}

impl DispatchOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            top_n: config.top_n,
        }
    }

    /// Apply per-request overrides, keeping values in range.
    pub fn with_overrides(self, confidence_threshold: Option<f64>, top_n: Option<usize>) -> Self {
        Self {
            confidence_threshold: confidence_threshold
                .map(|t| t.clamp(0.0, 1.0))
                .unwrap_or(self.confidence_threshold),
            top_n: top_n.map(|n| n.max(1)).unwrap_or(self.top_n),
        }
    }
}

/// Single entry point for classification: normalizes the document to text,
/// runs the selected strategy and validates its label against the category
/// registry, so every strategy presents the same contract to callers.
pub struct Dispatcher {
    extractor: Arc<dyn TextExtractor>,
    few_shot: Arc<dyn Classifier>,
    statistical: Option<Arc<dyn Classifier>>,
    llm: Option<Arc<dyn Classifier>>,
    defaults: DispatchOptions,
    min_text_chars: usize,
    batch_concurrency: usize,
}

impl Dispatcher {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            extractor,
            few_shot: Arc::new(FewShotMatcher::new()),
            statistical: None,
            llm: None,
            defaults: DispatchOptions::default(),
            min_text_chars: 1,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    pub fn with_statistical(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.statistical = Some(classifier);
        self
    }

    pub fn with_llm(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.llm = Some(classifier);
        self
    }

    pub fn with_defaults(mut self, defaults: DispatchOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars.max(1);
        self
    }

    pub fn with_batch_concurrency(mut self, batch_concurrency: usize) -> Self {
        self.batch_concurrency = batch_concurrency.max(1);
        self
    }

    pub fn defaults(&self) -> DispatchOptions {
        self.defaults
    }

    /// Whether the strategy can serve requests right now.
    pub fn is_ready(&self, kind: StrategyKind) -> bool {
        self.strategy(kind).is_ok()
    }

    /// The error a request for `kind` would fail with, if any.
    pub fn ensure_ready(&self, kind: StrategyKind) -> Result<()> {
        self.strategy(kind).map(|_| ())
    }

    fn strategy(&self, kind: StrategyKind) -> Result<&Arc<dyn Classifier>> {
        match kind {
            StrategyKind::FewShot => Ok(&self.few_shot),
            StrategyKind::Statistical => self.statistical.as_ref().ok_or_else(|| {
                CovenantError::ModelNotLoaded(
                    "no statistical model artifact was loaded at startup".into(),
                )
            }),
            StrategyKind::Llm => self.llm.as_ref().ok_or_else(|| {
                CovenantError::UpstreamUnavailable("LLM provider is not configured".into())
            }),
        }
    }

    fn check_text(&self, text: &str) -> Result<()> {
        let chars = text.trim().chars().count();
        if chars == 0 {
            return Err(CovenantError::InvalidInput("text is empty".into()));
        }
        if chars < self.min_text_chars {
            return Err(CovenantError::InvalidInput(format!(
                "text too short for classification (minimum {} characters required)",
                self.min_text_chars
            )));
        }
        Ok(())
    }

    pub async fn dispatch(
        &self,
        document: &Document,
        kind: StrategyKind,
    ) -> Result<ClassificationResult> {
        self.dispatch_with(document, kind, self.defaults).await
    }

    #[instrument(skip(self, document, options), fields(strategy = %kind, pdf = document.is_pdf()))]
    pub async fn dispatch_with(
        &self,
        document: &Document,
        kind: StrategyKind,
        options: DispatchOptions,
    ) -> Result<ClassificationResult> {
        // Resolve the strategy before any extraction work so an unavailable
        // strategy fails fast and consistently.
        let classifier = self.strategy(kind)?;

        let (text, used_ocr): (Cow<'_, str>, bool) = match document {
            Document::RawText(text) => (Cow::Borrowed(text.as_str()), false),
            Document::PdfBytes(bytes) => {
                let outcome = self.extractor.extract(bytes).await.map_err(|e| match e {
                    CovenantError::UnreadablePdf(msg) => {
                        CovenantError::InvalidInput(format!("unreadable PDF: {msg}"))
                    }
                    other => other,
                })?;
                (Cow::Owned(outcome.text), outcome.used_ocr)
            }
        };

        self.check_text(&text)?;

        let output = classifier.classify(&text).await?;
        let result = Self::shape(output, kind, used_ocr, &text, options);

        info!(
            category = %result.category,
            confidence = ?result.confidence,
            used_ocr,
            "Classification complete"
        );

        Ok(result)
    }

    /// Classify many texts, at most `batch_concurrency` at a time. Failures
    /// are reported per item and never fail the batch; every input gets an
    /// item and items come back in input order.
    pub async fn dispatch_batch(
        self: Arc<Self>,
        texts: Vec<String>,
        kind: StrategyKind,
        options: DispatchOptions,
    ) -> Vec<BatchItem> {
        info!(
            count = texts.len(),
            strategy = %kind,
            concurrency = self.batch_concurrency,
            "Starting batch classification"
        );

        let permits = Arc::new(Semaphore::new(self.batch_concurrency));
        let mut join_set = tokio::task::JoinSet::new();
        let mut task_index = HashMap::with_capacity(texts.len());
        for (index, text) in texts.into_iter().enumerate() {
            let dispatcher = Arc::clone(&self);
            let permits = Arc::clone(&permits);
            let handle = join_set.spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|e| {
                    CovenantError::Internal(format!("batch limiter closed: {e}"))
                })?;
                let document = Document::RawText(text);
                dispatcher.dispatch_with(&document, kind, options).await
            });
            task_index.insert(handle.id(), index);
        }

        let mut items = Vec::with_capacity(task_index.len());
        while let Some(joined) = join_set.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(join_err) => {
                    error!(error = %join_err, "Task panicked during batch classification");
                    (
                        join_err.id(),
                        Err(CovenantError::Internal("classification task failed".into())),
                    )
                }
            };
            let Some(&index) = task_index.get(&id) else {
                continue;
            };
            match outcome {
                Ok(result) => items.push(BatchItem {
                    index,
                    result: Some(result),
                    error: None,
                }),
                Err(e) => {
                    warn!(index, error = %e, "Batch item failed");
                    items.push(BatchItem {
                        index,
                        result: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        items.sort_by_key(|item| item.index);
        items
    }

    /// Turn raw strategy output into a validated result.
    fn shape(
        output: StrategyOutput,
        kind: StrategyKind,
        used_ocr: bool,
        text: &str,
        options: DispatchOptions,
    ) -> ClassificationResult {
        let category = match output.label.as_deref() {
            Some(label) => match category::validate(label) {
                Ok(category) => category,
                Err(e) => {
                    warn!(strategy = %kind, label, error = %e, "Strategy label rejected, abstaining");
                    Category::Unknown
                }
            },
            None => Category::Unknown,
        };

        let confidence = output.confidence.map(|c| c.clamp(0.0, 1.0));
        let is_confident = category.is_known()
            && confidence.map_or(true, |c| c >= options.confidence_threshold);

        let all_scores: BTreeMap<Category, f64> = output
            .scores
            .iter()
            .map(|s| (s.category, s.confidence))
            .collect();

        let mut top_predictions: Vec<ScoredCategory> = output.scores;
        top_predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        top_predictions.truncate(options.top_n);

        ClassificationResult {
            category,
            confidence,
            strategy_used: kind,
            is_confident,
            all_scores,
            top_predictions,
            reason: output.reason,
            used_ocr,
            text_preview: preview(text, PREVIEW_CHARS),
        }
    }
}
