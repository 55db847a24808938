//! HTTP surface of the contract classifier.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{build_app, create_router};
pub use state::AppState;
