//! Artist endpoints. Reachable only with a valid bearer token under the
//! default route table.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::api::AppState;
use crate::http::middleware::AuthContext;
use crate::http::response::ApiError;
use crate::store::{Artist, NewArtist};

/// `GET /api/artists`
pub async fn list(State(state): State<AppState>) -> Json<Vec<Artist>> {
    Json(state.catalog.artists())
}

/// `GET /api/artists/{id}`
pub async fn get(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Artist>, ApiError> {
    state
        .catalog
        .artist(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("artist {id}")))
}

/// `POST /api/artists`
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<NewArtist>,
) -> Result<(StatusCode, Json<Artist>), ApiError> {
    let artist = state.catalog.create_artist(body)?;
    tracing::info!(
        artist_id = artist.id,
        created_by = auth.subject().unwrap_or("anonymous"),
        "Artist created"
    );
    Ok((StatusCode::CREATED, Json(artist)))
}
