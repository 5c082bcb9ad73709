use axum::{extract::State, Json};

use crate::api::AppState;
use crate::store::Regional;

/// `GET /api/regionais`
pub async fn list(State(state): State<AppState>) -> Json<Vec<Regional>> {
    Json(state.catalog.regionais().to_vec())
}
