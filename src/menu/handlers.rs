use axum::{extract::State, Json};
use tracing::instrument;

use crate::error::AppError;
use crate::identity::Identity;
use crate::state::AppState;

use super::dto::TodayItem;
use super::repo;

#[instrument(skip(state, _identity))]
pub async fn todays_items(
    State(state): State<AppState>,
    _identity: Identity,
) -> Result<Json<Vec<TodayItem>>, AppError> {
    let items = repo::todays_items(&state.db).await?;
    Ok(Json(items.into_iter().map(TodayItem::from).collect()))
}
