use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;

use crate::api::format::{place_body, MessageBody, PlaceBody};
use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::extract::{parse_id, Payload};
use crate::middleware::{ApiResponse, AuthUser};
use crate::services::{NewPlace, PlaceChanges};
use crate::validation::{FieldRules, Rule, Validate};

const NO_PLACE: &str = "Could not find a place for the provided id.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreatePlaceRequest {
    pub title: String,
    pub description: String,
    pub address: String,
}

impl Validate for CreatePlaceRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new("title", &self.title, &[Rule::NotEmpty]),
            FieldRules::new("description", &self.description, &[Rule::MinLength(5)]),
            FieldRules::new("address", &self.address, &[Rule::NotEmpty]),
        ]
    }
}

/// Only title and description are editable; other keys are ignored
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdatePlaceRequest {
    pub title: String,
    pub description: String,
}

impl Validate for UpdatePlaceRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new("title", &self.title, &[Rule::NotEmpty]),
            FieldRules::new("description", &self.description, &[Rule::MinLength(5)]),
        ]
    }
}

/// POST /api/places
///
/// The creator is always the authenticated user; a `creator` field in the
/// body is ignored.
pub async fn post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Payload<CreatePlaceRequest>,
) -> Result<ApiResponse<PlaceBody>, ApiError> {
    let Payload { body, image } = payload;
    let place = state
        .places
        .create(
            auth.user_id,
            NewPlace {
                title: body.title,
                description: body.description,
                address: body.address,
                image,
            },
        )
        .await?;

    Ok(ApiResponse::created(place_body(place)))
}

/// PATCH /api/places/:pid
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(pid): Path<String>,
    payload: Payload<UpdatePlaceRequest>,
) -> Result<ApiResponse<PlaceBody>, ApiError> {
    let id = parse_id(&pid, NO_PLACE)?;
    let body = payload.body;
    let place = state
        .places
        .update(
            auth.user_id,
            id,
            PlaceChanges {
                title: body.title,
                description: body.description,
            },
        )
        .await?;

    Ok(ApiResponse::success(place_body(place)))
}

/// DELETE /api/places/:pid
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(pid): Path<String>,
) -> Result<ApiResponse<MessageBody>, ApiError> {
    let id = parse_id(&pid, NO_PLACE)?;
    state.places.delete(auth.user_id, id).await?;

    Ok(ApiResponse::success(MessageBody {
        message: "Deleted place.".to_string(),
    }))
}
