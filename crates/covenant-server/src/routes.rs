use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        // Registry
        .route("/categories", get(handlers::categories::list_categories))
        // Statistical model
        .route(
            "/tf_logistic_regression/model-info",
            get(handlers::model::model_info),
        )
        // Classification
        .route("/{strategy}/classify", post(handlers::classify::classify_text))
        .route(
            "/{strategy}/classify/batch",
            post(handlers::classify::classify_batch),
        )
        .route(
            "/{strategy}/classify-pdf",
            post(handlers::classify::classify_pdf),
        )
}

/// Router with state and middleware applied, ready to serve.
pub fn build_app(state: AppState) -> Router {
    // Multipart framing adds a little on top of the file itself.
    let body_limit = state.config.max_upload_bytes.saturating_add(64 * 1024);

    create_router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
