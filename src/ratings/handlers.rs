use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::instrument;

use crate::error::AppError;
use crate::identity::Identity;
use crate::state::AppState;
use crate::users::repo::Macros;

use super::dto::{LogMacrosRequest, RateRequest, RatedItemResponse, ResetMacrosRequest};
use super::services;

#[instrument(skip(state, _identity, body))]
pub async fn submit_rating(
    State(state): State<AppState>,
    _identity: Identity,
    Json(body): Json<RateRequest>,
) -> Result<Json<RatedItemResponse>, AppError> {
    let item =
        services::submit_rating(&state.db, body.title.trim(), body.uid.trim(), body.value).await?;
    let average_rating = item.rating / item.rating_count.max(1) as f64;
    Ok(Json(RatedItemResponse {
        item: item.into(),
        average_rating,
    }))
}

#[derive(Debug, serde::Serialize)]
pub struct MacrosResponse {
    pub macros: Macros,
}

#[instrument(skip(state, _identity, body))]
pub async fn log_macros(
    State(state): State<AppState>,
    _identity: Identity,
    Json(body): Json<LogMacrosRequest>,
) -> Result<Json<MacrosResponse>, AppError> {
    let macros = services::log_macros(
        &state.db,
        body.uid.trim(),
        body.serving_size,
        &body.food_item.nutritional_info,
    )
    .await?;
    Ok(Json(MacrosResponse { macros }))
}

#[instrument(skip(state, _identity, body))]
pub async fn reset_macros(
    State(state): State<AppState>,
    _identity: Identity,
    Json(body): Json<ResetMacrosRequest>,
) -> Result<Json<Value>, AppError> {
    services::reset_macros(&state.db, body.uid.trim()).await?;
    Ok(Json(json!({})))
}
