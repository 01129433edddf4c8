pub mod dto;
pub mod handlers;
pub mod services;

use axum::{routing::post, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ratings", post(handlers::submit_rating))
        .route("/macros/log", post(handlers::log_macros))
        .route("/macros/reset", post(handlers::reset_macros))
}
