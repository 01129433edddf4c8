use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::identity::Identity;
use crate::state::AppState;

use super::dto::{CreateUserRequest, RatedFoodResponse};
use super::repo;

#[instrument(skip(state, _identity, body))]
pub async fn create_user(
    State(state): State<AppState>,
    _identity: Identity,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let uid = body.uid.trim();
    if uid.is_empty() {
        return Err(AppError::Validation("uid is required".into()));
    }

    let created = repo::create_if_absent(&state.db, uid).await?;
    info!(%uid, created, "user create");

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!({ "uid": uid }))))
}

#[instrument(skip(state, _identity))]
pub async fn rated_food(
    State(state): State<AppState>,
    _identity: Identity,
    Path(uid): Path<String>,
) -> Result<Json<RatedFoodResponse>, AppError> {
    let user = repo::find(&state.db, &uid)
        .await?
        .ok_or(AppError::NotFound("unknown user"))?;
    Ok(Json(RatedFoodResponse {
        rated_food: user.rated_food,
    }))
}
