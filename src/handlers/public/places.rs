use axum::extract::{Path, State};

use crate::api::format::{place_body, places_body, PlaceBody, PlacesBody};
use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::extract::parse_id;
use crate::middleware::ApiResponse;

/// GET /api/places/:pid
pub async fn get(
    State(state): State<AppState>,
    Path(pid): Path<String>,
) -> Result<ApiResponse<PlaceBody>, ApiError> {
    let id = parse_id(&pid, "Could not find a place for the provided id.")?;
    let place = state.places.get(id).await?;
    Ok(ApiResponse::success(place_body(place)))
}

/// GET /api/places/user/:uid
pub async fn list_by_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<ApiResponse<PlacesBody>, ApiError> {
    let user_id = parse_id(&uid, "Could not find places for the provided user id.")?;
    let places = state.places.list_for_user(user_id).await?;
    Ok(ApiResponse::success(places_body(places)))
}
