use axum::{response::IntoResponse, Json};

use covenant_core::api_types::CategoriesResponse;

pub async fn list_categories() -> impl IntoResponse {
    Json(CategoriesResponse::registry())
}
