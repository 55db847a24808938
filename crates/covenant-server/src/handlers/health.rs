use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::info;

use covenant_core::api_types::{HealthResponse, RootResponse};
use covenant_core::StrategyKind;

use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: "Contract Classifier API is running".to_string(),
    })
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    info!("Health check requested");

    let statistical_model_loaded = state.dispatcher.is_ready(StrategyKind::Statistical);
    let llm_configured = state.dispatcher.is_ready(StrategyKind::Llm);

    let status = if statistical_model_loaded && llm_configured {
        "ok".to_string()
    } else {
        "degraded".to_string()
    };

    let response = HealthResponse {
        status,
        version: VERSION.to_string(),
        statistical_model_loaded,
        llm_configured,
        ocr_enabled: state.config.ocr.enabled,
    };

    (StatusCode::OK, Json(response))
}
