// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::services::{GeocodeError, ServiceError};
use crate::validation::Finding;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 401 Unauthorized: missing/bad credentials or token
    Unauthorized(String),

    // 401 Unauthorized: authenticated, but not the owner of the resource
    NotOwner(String),

    // 404 Not Found
    NotFound(String),

    // 422 Unprocessable Entity: rule findings on the payload
    ValidationError {
        message: String,
        findings: Vec<Finding>,
    },

    // 422 Unprocessable Entity: well-formed request that cannot be applied
    UnprocessableEntity(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotOwner(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotOwner(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::UnprocessableEntity(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotOwner(_) => "NOT_OWNER",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "message": self.message(),
            "code": self.error_code(),
        });
        if let ApiError::ValidationError { findings, .. } = self {
            body["findings"] = json!(findings);
        }
        body
    }
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_owner(message: impl Into<String>) -> Self {
        ApiError::NotOwner(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn validation_error(message: impl Into<String>, findings: Vec<Finding>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            findings,
        }
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        ApiError::UnprocessableEntity(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<Vec<Finding>> for ApiError {
    fn from(findings: Vec<Finding>) -> Self {
        ApiError::validation_error("Invalid inputs passed, please check your data.", findings)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => {
                tracing::error!("Database connection error: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                // Log the real error but return generic message
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::InvalidCredentials(msg) => ApiError::unauthorized(msg),
            ServiceError::NotOwner(msg) => ApiError::not_owner(msg),
            ServiceError::Conflict(msg) => ApiError::unprocessable_entity(msg),
            ServiceError::Geocode(GeocodeError::NoMatch(address)) => {
                tracing::debug!("No geocoding match for '{}'", address);
                ApiError::unprocessable_entity("Could not find location for the specified address.")
            }
            ServiceError::Geocode(e) => {
                tracing::error!("Geocoding failed: {}", e);
                ApiError::internal_server_error(
                    "Could not resolve the address right now, please try again later.",
                )
            }
            ServiceError::Media(e) => {
                tracing::error!("Media hosting failed: {}", e);
                ApiError::internal_server_error("Could not store the image, please try again later.")
            }
            ServiceError::Transaction(e) => {
                tracing::error!("Transaction aborted: {}", e);
                ApiError::internal_server_error("Could not save changes, please try again.")
            }
            ServiceError::Database(e) => e.into(),
            ServiceError::Token(e) => {
                tracing::error!("Token issuance failed: {}", e);
                ApiError::internal_server_error("Could not complete sign in, please try again.")
            }
            ServiceError::PasswordHash(msg) => {
                tracing::error!("Password hashing failed: {}", msg);
                ApiError::internal_server_error("Could not complete sign in, please try again.")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MediaError;

    #[test]
    fn ownership_and_credentials_share_status_but_not_code() {
        let owner: ApiError = ServiceError::NotOwner("nope".to_string()).into();
        let creds: ApiError = ServiceError::InvalidCredentials("nope".to_string()).into();

        assert_eq!(owner.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(creds.status_code(), StatusCode::UNAUTHORIZED);
        assert_ne!(owner.error_code(), creds.error_code());
    }

    #[test]
    fn geocoding_no_match_is_client_error_upstream_is_server_error() {
        let no_match: ApiError =
            ServiceError::Geocode(GeocodeError::NoMatch("nowhere".to_string())).into();
        assert_eq!(no_match.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let upstream: ApiError =
            ServiceError::Geocode(GeocodeError::Upstream("HTTP 503 secret detail".to_string())).into();
        assert_eq!(upstream.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!upstream.message().contains("secret detail"));
    }

    #[test]
    fn internal_detail_never_reaches_body() {
        let cases: Vec<ApiError> = vec![
            ServiceError::Media(MediaError::Upstream("api_secret=abc".to_string())).into(),
            ServiceError::Transaction(DatabaseError::QueryError("relation users".to_string())).into(),
            ServiceError::Database(DatabaseError::QueryError("syntax error at".to_string())).into(),
        ];
        for err in cases {
            let body = err.to_json().to_string();
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!body.contains("api_secret"));
            assert!(!body.contains("relation users"));
            assert!(!body.contains("syntax error"));
        }
    }

    #[test]
    fn connection_loss_is_unavailable() {
        let err: ApiError = DatabaseError::ConnectionError("refused".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn validation_body_lists_findings() {
        let err: ApiError = vec![Finding {
            field: "title".to_string(),
            message: "must not be empty".to_string(),
        }]
        .into();

        let body = err.to_json();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Invalid inputs passed, please check your data.");
        assert_eq!(body["findings"][0]["field"], "title");
    }
}
