use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::services::{compute_stats, StatsResponse};
use crate::state::AppState;

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

#[instrument(skip(state))]
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(compute_stats(state.complaints.as_ref()).await)
}
