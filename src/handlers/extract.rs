use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::ImageUpload;
use crate::validation::Validate;

/// Name of the multipart part that carries an attached image
pub const IMAGE_FIELD: &str = "image";

const BAD_BODY: &str = "Invalid request body, please check your data.";

/// Validated request payload plus an optional image attachment.
///
/// Accepts `application/json` or `multipart/form-data`. In multipart form the
/// text parts become the payload fields and the `image` part, when present
/// and non-empty, becomes the attachment. Rule findings reject the request
/// with 422 before the handler runs.
#[derive(Debug)]
pub struct Payload<T> {
    pub body: T,
    pub image: Option<ImageUpload>,
}

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut payload = if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state).await.map_err(|e| {
                tracing::debug!("Multipart rejected: {}", e.body_text());
                ApiError::unprocessable_entity(BAD_BODY)
            })?;
            read_multipart(multipart).await?
        } else {
            let Json(body) = Json::<T>::from_request(req, state).await.map_err(|e| {
                tracing::debug!("JSON body rejected: {}", e.body_text());
                ApiError::unprocessable_entity(BAD_BODY)
            })?;
            Payload { body, image: None }
        };

        payload.body.validate()?;
        Ok(payload)
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

async fn read_multipart<T: DeserializeOwned>(mut multipart: Multipart) -> Result<Payload<T>, ApiError> {
    let mut fields = Map::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!("Unreadable multipart field: {}", e);
        ApiError::unprocessable_entity(BAD_BODY)
    })? {
        let name = field.name().unwrap_or_default().to_string();

        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| {
                tracing::debug!("Unreadable image part: {}", e);
                ApiError::unprocessable_entity(BAD_BODY)
            })?;
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let text = field.text().await.map_err(|e| {
                tracing::debug!("Unreadable text part '{}': {}", name, e);
                ApiError::unprocessable_entity(BAD_BODY)
            })?;
            fields.insert(name, Value::String(text));
        }
    }

    let body = serde_json::from_value(Value::Object(fields)).map_err(|e| {
        tracing::debug!("Multipart fields rejected: {}", e);
        ApiError::unprocessable_entity(BAD_BODY)
    })?;

    Ok(Payload { body, image })
}

/// Path ids that are not UUIDs can never match a stored record
pub fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(not_found))
}
