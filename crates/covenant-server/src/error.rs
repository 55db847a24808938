use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use covenant_core::api_types::ErrorResponse;
use covenant_core::CovenantError;

/// Error returned by every handler, rendered as `{"error", "code"}` JSON.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            format!("upload exceeds the {limit} byte limit"),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CovenantError> for ApiError {
    fn from(err: CovenantError) -> Self {
        let status = match &err {
            CovenantError::InvalidInput(_) | CovenantError::UnreadablePdf(_) => {
                StatusCode::BAD_REQUEST
            }
            CovenantError::UnsupportedFileType(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CovenantError::ModelNotLoaded(_)
            | CovenantError::OcrUnavailable(_)
            | CovenantError::UpstreamRateLimited { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CovenantError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            CovenantError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let retry_after_secs = match &err {
            CovenantError::UpstreamRateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        };

        if err.is_client_error() {
            tracing::info!(code = err.code(), "Request rejected: {err}");
        } else {
            tracing::error!(code = err.code(), "Request failed: {err}");
        }

        Self {
            status,
            code: err.code(),
            message: err.to_string(),
            retry_after_secs,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => Self::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                rejection.body_text(),
            ),
            _ => Self::bad_request(rejection.body_text()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", err.body_text())
            }
            _ => Self::bad_request(err.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
            code: self.code.to_string(),
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
