//! Shared fixtures for the integration suites: contract texts, synthetic
//! PDFs, a scripted OCR engine and a ready-wired application state.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};

use covenant_classify::{Dispatcher, StatisticalClassifier, StatisticalModel};
use covenant_core::{AppConfig, Category, Result};
use covenant_extraction::{ExtractionPolicy, OcrEngine, PdfTextExtractor};
use covenant_server::AppState;

pub const EMPLOYMENT_TEXT: &str =
    "This agreement is made between employer and employee regarding terms of employment...";

/// One realistic clause per category.
pub const CATEGORY_FIXTURES: [(Category, &str); 5] = [
    (
        Category::Employment,
        "The employer agrees to pay the employee an annual salary with health benefits. \
         Employment may end by termination with thirty days notice.",
    ),
    (
        Category::Nda,
        "The recipient shall keep all confidential and proprietary information secret and \
         shall not disclose any trade secrets without prior written consent.",
    ),
    (
        Category::Partnership,
        "The partners form a partnership and agree on capital contributions, profit sharing \
         and joint management of the venture.",
    ),
    (
        Category::Service,
        "The provider guarantees 99.9% uptime and availability. Response times and other \
         performance metrics are reported monthly under this service level agreement.",
    ),
    (
        Category::Vendor,
        "The vendor shall supply the goods listed in each purchase order and arrange delivery \
         and shipment to the buyer on receipt of invoice.",
    ),
];

pub const NDA_CLAUSES: [&str; 3] = [
    "MUTUAL NON-DISCLOSURE AGREEMENT",
    "The recipient shall hold all confidential information in strict confidence.",
    "Proprietary data and trade secrets shall not be disclosed to any third party.",
];

/// Path to the model artifact shipped with the repository.
pub fn shipped_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../models/contract_classifier.json")
}

pub fn shipped_model() -> Arc<StatisticalModel> {
    Arc::new(StatisticalModel::load(&shipped_model_path()).expect("shipped model loads"))
}

/// A PDF with a real text layer: one page, one text line per entry.
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(11)]),
        Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new(
                "Td",
                vec![Object::Integer(0), Object::Integer(-16)],
            ));
        }
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
    }
    operations.push(Operation::new("ET", vec![]));
    single_page_pdf(Content { operations })
}

/// A PDF whose only page is drawn graphics with no text layer, the way a
/// scanner's output looks to a text extractor.
pub fn scanned_pdf() -> Vec<u8> {
    let operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "re",
            vec![
                Object::Integer(72),
                Object::Integer(500),
                Object::Integer(450),
                Object::Integer(250),
            ],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ];
    single_page_pdf(Content { operations })
}

fn single_page_pdf(content: Content) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("content stream encodes"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("PDF serializes");
    bytes
}

/// OCR engine that "recognizes" a fixed transcript and counts its calls.
/// With a delay it stands in for a slow engine; `completions` only counts
/// runs that were not cancelled.
pub struct ScriptedOcr {
    transcript: String,
    delay: Duration,
    calls: AtomicUsize,
    completions: AtomicUsize,
}

impl ScriptedOcr {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            completions: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn recognize(&self, _pdf_bytes: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(self.transcript.clone())
    }
}

pub fn extractor_with(ocr: Option<Arc<dyn OcrEngine>>) -> PdfTextExtractor {
    extractor_with_timeout(ocr, Duration::from_secs(5))
}

pub fn extractor_with_timeout(
    ocr: Option<Arc<dyn OcrEngine>>,
    ocr_timeout: Duration,
) -> PdfTextExtractor {
    PdfTextExtractor::new(ExtractionPolicy::default(), ocr, ocr_timeout)
}

/// Config pointing at the shipped model with the LLM disabled.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.model_path = shipped_model_path();
    config.ocr.enabled = false;
    config
}

/// Application state with the shipped model, the given OCR engine and an
/// optional LLM endpoint.
pub fn app_state(ocr: Option<Arc<dyn OcrEngine>>, llm_url: Option<String>) -> AppState {
    let ocr_enabled = ocr.is_some();
    app_state_with(extractor_with(ocr), ocr_enabled, llm_url)
}

/// Application state around a caller-built extractor.
pub fn app_state_with(
    extractor: PdfTextExtractor,
    ocr_enabled: bool,
    llm_url: Option<String>,
) -> AppState {
    let mut config = test_config();
    config.ocr.enabled = ocr_enabled;

    let model = shipped_model();
    let mut dispatcher = Dispatcher::new(Arc::new(extractor))
        .with_min_text_chars(config.min_text_chars)
        .with_statistical(Arc::new(StatisticalClassifier::new(Arc::clone(&model))));

    if let Some(url) = llm_url {
        config.llm.api_key = "test-key".into();
        config.llm.api_url = url;
        config.llm.timeout_secs = 5;
        let llm = covenant_classify::LlmClassifier::new(&config.llm).expect("LLM client builds");
        dispatcher = dispatcher.with_llm(Arc::new(llm));
    }

    AppState::new(config, dispatcher, Some(model))
}
