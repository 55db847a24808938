use std::sync::Arc;
use std::time::Duration;

use covenant_classify::{
    DispatchOptions, Dispatcher, FewShotMatcher, ModelArtifact, StatisticalClassifier,
    StatisticalModel,
};
use covenant_core::{Category, Classifier, CovenantError, Document, StrategyKind, TextExtractor};
use covenant_tests::{
    extractor_with, extractor_with_timeout, scanned_pdf, shipped_model, shipped_model_path, text_pdf, ScriptedOcr,
    CATEGORY_FIXTURES, EMPLOYMENT_TEXT, NDA_CLAUSES,
};

fn local_dispatcher(ocr: Option<Arc<ScriptedOcr>>) -> Dispatcher {
    let ocr = ocr.map(|o| o as Arc<dyn covenant_extraction::OcrEngine>);
    Dispatcher::new(Arc::new(extractor_with(ocr)))
        .with_min_text_chars(10)
        .with_statistical(Arc::new(StatisticalClassifier::new(shipped_model())))
}

// ---------------------------------------------------------------------------
// Shipped model artifact
// ---------------------------------------------------------------------------

#[test]
fn shipped_model_covers_every_category() {
    let model = shipped_model();
    assert_eq!(model.classes(), &Category::ALL);
    assert!(model.feature_count() > 0);
    assert_eq!(model.source(), Some(shipped_model_path().as_path()));
}

#[test]
fn shipped_model_probabilities_sum_to_one() {
    let model = shipped_model();
    for (_, text) in CATEGORY_FIXTURES {
        let total: f64 = model.predict_proba(text).iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "text: {text}");
    }
}

#[test]
fn artifact_with_unsupported_class_is_rejected() {
    let mut artifact =
        ModelArtifact::from_file(&shipped_model_path()).expect("shipped artifact parses");
    artifact.classes[0] = "Lease Agreements".into();
    let err = StatisticalModel::from_artifact(artifact).err().expect("load should fail");
    assert!(matches!(err, CovenantError::ModelNotLoaded(_)));
}

#[test]
fn missing_artifact_is_model_not_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let err = StatisticalModel::load(&dir.path().join("absent.json"))
        .err()
        .expect("load should fail");
    assert!(matches!(err, CovenantError::ModelNotLoaded(_)));
}

// ---------------------------------------------------------------------------
// Per-category fixtures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fixtures_classify_to_their_category_under_local_strategies() {
    let dispatcher = local_dispatcher(None);
    for kind in [StrategyKind::FewShot, StrategyKind::Statistical] {
        for (category, text) in CATEGORY_FIXTURES {
            let result = dispatcher
                .dispatch(&text.into(), kind)
                .await
                .expect("classification succeeds");
            assert_eq!(result.category, category, "{kind}: {text}");
            assert_eq!(result.strategy_used, kind);
        }
    }
}

#[tokio::test]
async fn employment_scenario_is_employment() {
    let dispatcher = local_dispatcher(None);
    for kind in [StrategyKind::FewShot, StrategyKind::Statistical] {
        let result = dispatcher.dispatch(&EMPLOYMENT_TEXT.into(), kind).await.unwrap();
        assert_eq!(result.category, Category::Employment, "{kind}");
    }
}

#[tokio::test]
async fn local_strategies_are_idempotent() {
    let dispatcher = local_dispatcher(None);
    for kind in [StrategyKind::FewShot, StrategyKind::Statistical] {
        for (_, text) in CATEGORY_FIXTURES {
            let first = dispatcher.dispatch(&text.into(), kind).await.unwrap();
            let second = dispatcher.dispatch(&text.into(), kind).await.unwrap();
            assert_eq!(first, second);
        }
    }
}

#[tokio::test]
async fn strategies_abstain_on_empty_text() {
    let few_shot = FewShotMatcher::new();
    let statistical = StatisticalClassifier::new(shipped_model());
    for classifier in [&few_shot as &dyn Classifier, &statistical] {
        let output = classifier.classify("").await.unwrap();
        assert!(output.label.is_none(), "{}", classifier.kind());
    }
}

#[tokio::test]
async fn threshold_controls_is_confident() {
    let dispatcher = local_dispatcher(None);
    let text: Document = EMPLOYMENT_TEXT.into();

    let lenient = DispatchOptions {
        confidence_threshold: 0.0,
        top_n: 5,
    };
    let result = dispatcher
        .dispatch_with(&text, StrategyKind::FewShot, lenient)
        .await
        .unwrap();
    assert!(result.is_confident);
    assert_eq!(result.top_predictions.len(), 5);

    let strict = DispatchOptions {
        confidence_threshold: 1.0,
        top_n: 1,
    };
    let result = dispatcher
        .dispatch_with(&text, StrategyKind::FewShot, strict)
        .await
        .unwrap();
    assert!(!result.is_confident);
    assert_eq!(result.top_predictions.len(), 1);
}

// ---------------------------------------------------------------------------
// PDF extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn digital_pdf_uses_text_layer() {
    let ocr = Arc::new(ScriptedOcr::new("should not be used"));
    let extractor = extractor_with(Some(ocr.clone()));
    let outcome = extractor.extract(&text_pdf(&NDA_CLAUSES)).await.unwrap();
    assert!(!outcome.used_ocr);
    assert_eq!(outcome.page_count, 1);
    assert!(outcome.text.contains("confidential"), "text: {}", outcome.text);
    assert_eq!(ocr.calls(), 0);
}

#[tokio::test]
async fn scanned_nda_is_ocred_and_classified() {
    let ocr = Arc::new(ScriptedOcr::new(NDA_CLAUSES.join("\n")));
    let dispatcher = local_dispatcher(Some(ocr.clone()));

    for kind in [StrategyKind::FewShot, StrategyKind::Statistical] {
        let result = dispatcher
            .dispatch(&Document::PdfBytes(scanned_pdf()), kind)
            .await
            .unwrap();
        assert!(result.used_ocr);
        assert_eq!(result.category, Category::Nda, "{kind}");
    }
    assert_eq!(ocr.calls(), 2);
}

#[tokio::test]
async fn digital_and_scanned_copies_agree() {
    let ocr = Arc::new(ScriptedOcr::new(NDA_CLAUSES.join("\n")));
    let dispatcher = local_dispatcher(Some(ocr));

    let digital = dispatcher
        .dispatch(&Document::PdfBytes(text_pdf(&NDA_CLAUSES)), StrategyKind::Statistical)
        .await
        .unwrap();
    let scanned = dispatcher
        .dispatch(&Document::PdfBytes(scanned_pdf()), StrategyKind::Statistical)
        .await
        .unwrap();

    assert!(!digital.used_ocr);
    assert!(scanned.used_ocr);
    assert_eq!(digital.category, scanned.category);
}

#[tokio::test]
async fn blank_ocr_transcript_is_invalid_input() {
    let ocr = Arc::new(ScriptedOcr::new("  \n "));
    let dispatcher = local_dispatcher(Some(ocr));
    let err = dispatcher
        .dispatch(&Document::PdfBytes(scanned_pdf()), StrategyKind::FewShot)
        .await
        .unwrap_err();
    assert!(matches!(err, CovenantError::InvalidInput(_)));
}

#[tokio::test]
async fn short_digital_pdf_keeps_text_layer_without_ocr() {
    let pdf = text_pdf(&["Mutual NDA: keep secrets."]);

    let outcome = extractor_with(None).extract(&pdf).await.unwrap();
    assert!(!outcome.used_ocr);
    assert!(outcome.text.contains("NDA"), "text: {}", outcome.text);

    let result = local_dispatcher(None)
        .dispatch(&Document::PdfBytes(pdf), StrategyKind::FewShot)
        .await
        .unwrap();
    assert!(!result.used_ocr);
}

#[tokio::test]
async fn short_digital_pdf_survives_ocr_timeout() {
    let ocr = Arc::new(ScriptedOcr::new("never returned").with_delay(Duration::from_secs(2)));
    let extractor = extractor_with_timeout(Some(ocr.clone()), Duration::from_millis(50));

    let outcome = extractor
        .extract(&text_pdf(&["Mutual NDA: keep secrets."]))
        .await
        .unwrap();
    assert!(!outcome.used_ocr);
    assert_eq!(ocr.calls(), 1);
    assert_eq!(ocr.completions(), 0);
}

// ---------------------------------------------------------------------------
// OCR timeout and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_ocr_times_out() {
    let ocr = Arc::new(ScriptedOcr::new(NDA_CLAUSES.join("\n")).with_delay(Duration::from_secs(2)));
    let extractor = extractor_with_timeout(Some(ocr.clone()), Duration::from_millis(50));

    let err = extractor.extract(&scanned_pdf()).await.unwrap_err();
    assert!(matches!(err, CovenantError::Timeout(_)), "{err}");
    assert_eq!(err.code(), "timeout");
    assert_eq!(ocr.completions(), 0);
}

#[tokio::test]
async fn dropping_the_request_cancels_ocr() {
    let ocr = Arc::new(
        ScriptedOcr::new(NDA_CLAUSES.join("\n")).with_delay(Duration::from_secs(1)),
    );
    let extractor = extractor_with_timeout(Some(ocr.clone()), Duration::from_secs(5));
    let pdf = scanned_pdf();

    let abandoned = tokio::time::timeout(Duration::from_millis(300), extractor.extract(&pdf)).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(ocr.calls(), 1);
    assert_eq!(ocr.completions(), 0);
}
