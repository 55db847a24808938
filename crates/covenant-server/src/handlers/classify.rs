use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use covenant_core::api_types::{
    BatchResponse, BatchSummary, ClassifyBatchRequest, ClassifyResponse, ClassifyTextRequest,
};
use covenant_core::document::has_pdf_magic;
use covenant_core::{CovenantError, Document, StrategyKind};

use crate::error::ApiError;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

fn parse_strategy(segment: &str) -> Result<StrategyKind, ApiError> {
    segment.parse().map_err(|_| {
        ApiError::not_found(format!(
            "unknown strategy '{segment}' (expected one of: {})",
            StrategyKind::ALL
                .iter()
                .map(|k| k.slug())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}

#[instrument(skip(state, payload))]
pub async fn classify_text(
    State(state): State<AppState>,
    Path(strategy): Path<String>,
    payload: Result<Json<ClassifyTextRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_strategy(&strategy)?;
    let Json(request) = payload?;
    let options = state
        .dispatcher
        .defaults()
        .with_overrides(request.confidence_threshold, request.top_n);

    let result = state
        .dispatcher
        .dispatch_with(&Document::RawText(request.text), kind, options)
        .await?;

    let response = ClassifyResponse::from(result);
    info!(request_id = %response.request_id, category = %response.category, "Text classified");
    Ok((StatusCode::OK, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn classify_batch(
    State(state): State<AppState>,
    Path(strategy): Path<String>,
    payload: Result<Json<ClassifyBatchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_strategy(&strategy)?;
    let Json(request) = payload?;
    if request.texts.is_empty() {
        return Err(ApiError::bad_request("texts must contain at least one entry"));
    }
    // An unavailable strategy fails the whole batch, not each item.
    state.dispatcher.ensure_ready(kind)?;

    let options = state
        .dispatcher
        .defaults()
        .with_overrides(request.confidence_threshold, request.top_n);
    let results = state
        .dispatcher
        .clone()
        .dispatch_batch(request.texts, kind, options)
        .await;
    let summary = BatchSummary::from_items(&results);

    info!(
        total = summary.total_processed,
        failed = summary.failed_classifications,
        "Batch classified"
    );
    Ok((StatusCode::OK, Json(BatchResponse { results, summary })))
}

#[instrument(skip(state, multipart))]
pub async fn classify_pdf(
    State(state): State<AppState>,
    Path(strategy): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_strategy(&strategy)?;
    let limit = state.config.max_upload_bytes;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        upload = Some((file_name, content_type, bytes));
        break;
    }

    let Some((file_name, content_type, bytes)) = upload else {
        return Err(ApiError::bad_request(format!(
            "multipart field '{FILE_FIELD}' is required"
        )));
    };

    if bytes.len() > limit {
        return Err(ApiError::payload_too_large(limit));
    }

    let named_pdf = file_name
        .as_deref()
        .is_some_and(|n| n.to_ascii_lowercase().ends_with(".pdf"));
    let typed_pdf = content_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("application/pdf"));
    if !(named_pdf || typed_pdf || has_pdf_magic(&bytes)) {
        return Err(CovenantError::UnsupportedFileType(format!(
            "expected a PDF upload, got {} ({})",
            file_name.as_deref().unwrap_or("unnamed file"),
            content_type.as_deref().unwrap_or("no content type")
        ))
        .into());
    }

    info!(
        file_name = file_name.as_deref().unwrap_or_default(),
        size = bytes.len(),
        "Classifying uploaded PDF"
    );

    let result = state
        .dispatcher
        .dispatch(&Document::PdfBytes(bytes.to_vec()), kind)
        .await?;

    let response = ClassifyResponse::from(result);
    info!(
        request_id = %response.request_id,
        category = %response.category,
        used_ocr = response.used_ocr,
        "PDF classified"
    );
    Ok((StatusCode::OK, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_segment_accepts_slugs_and_aliases() {
        assert_eq!(parse_strategy("few-shot").unwrap(), StrategyKind::FewShot);
        assert_eq!(parse_strategy("few_shot").unwrap(), StrategyKind::FewShot);
        assert_eq!(
            parse_strategy("tf_logistic_regression").unwrap(),
            StrategyKind::Statistical
        );
        assert_eq!(parse_strategy("llm").unwrap(), StrategyKind::Llm);
        assert_eq!(
            parse_strategy("bert").unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
    }
}
