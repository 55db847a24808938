use std::sync::Arc;

use covenant_classify::{
    DispatchOptions, Dispatcher, LlmClassifier, StatisticalClassifier, StatisticalModel,
};
use covenant_core::{AppConfig, Result};
use covenant_extraction::PdfTextExtractor;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub dispatcher: Arc<Dispatcher>,
    pub statistical_model: Option<Arc<StatisticalModel>>,
}

impl AppState {
    /// Wire up extraction and every available strategy from configuration.
    ///
    /// A missing or malformed model artifact leaves the statistical strategy
    /// unavailable unless `require_model` is set, in which case it is fatal.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let statistical_model = match StatisticalModel::load(&config.model_path) {
            Ok(model) => Some(Arc::new(model)),
            Err(e) if config.require_model => return Err(e),
            Err(e) => {
                tracing::warn!(
                    path = %config.model_path.display(),
                    "Statistical model unavailable: {e}"
                );
                None
            }
        };

        let extractor = Arc::new(PdfTextExtractor::from_config(&config.ocr));
        let mut dispatcher = Dispatcher::new(extractor)
            .with_min_text_chars(config.min_text_chars)
            .with_batch_concurrency(config.batch_concurrency)
            .with_defaults(DispatchOptions::from_config(&config));

        if let Some(model) = &statistical_model {
            dispatcher = dispatcher.with_statistical(Arc::new(StatisticalClassifier::new(
                Arc::clone(model),
            )));
        }

        if config.llm.is_configured() {
            dispatcher = dispatcher.with_llm(Arc::new(LlmClassifier::new(&config.llm)?));
        } else {
            tracing::warn!("ANTHROPIC_API_KEY not set; the llm strategy is disabled");
        }

        Ok(Self::new(config, dispatcher, statistical_model))
    }

    pub fn new(
        config: AppConfig,
        dispatcher: Dispatcher,
        statistical_model: Option<Arc<StatisticalModel>>,
    ) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            statistical_model,
        }
    }
}
