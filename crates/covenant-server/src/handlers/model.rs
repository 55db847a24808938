use axum::{extract::State, response::IntoResponse, Json};

use covenant_core::api_types::ModelInfoResponse;

use crate::state::AppState;

pub async fn model_info(State(state): State<AppState>) -> impl IntoResponse {
    let response = match &state.statistical_model {
        Some(model) => ModelInfoResponse {
            loaded: true,
            model_path: model.source().map(|p| p.display().to_string()),
            classes: model.classes().to_vec(),
            feature_count: model.feature_count(),
        },
        None => ModelInfoResponse {
            loaded: false,
            model_path: Some(state.config.model_path.display().to_string()),
            classes: Vec::new(),
            feature_count: 0,
        },
    };
    Json(response)
}
