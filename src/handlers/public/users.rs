use axum::extract::State;
use serde::Deserialize;

use crate::api::format::{users_body, SessionBody, UsersBody};
use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::extract::Payload;
use crate::middleware::ApiResponse;
use crate::services::{AuthSession, NewUser};
use crate::validation::{normalize_email, FieldRules, Rule, Validate};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for SignupRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new("name", &self.name, &[Rule::MinLength(2)]),
            FieldRules::new("email", &self.email, &[Rule::Email]),
            FieldRules::new("password", &self.password, &[Rule::MinLength(8)]),
        ]
    }

    fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

impl Validate for SigninRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new("email", &self.email, &[Rule::Email]),
            FieldRules::new("password", &self.password, &[Rule::NotEmpty]),
        ]
    }

    fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
    }
}

impl From<AuthSession> for SessionBody {
    fn from(session: AuthSession) -> Self {
        Self {
            user_id: session.user_id,
            email: session.email,
            token: session.token,
        }
    }
}

/// GET /api/users
pub async fn list(State(state): State<AppState>) -> Result<ApiResponse<UsersBody>, ApiError> {
    let users = state.users.list().await?;
    Ok(ApiResponse::success(users_body(users)))
}

/// POST /api/users/signup
pub async fn signup(
    State(state): State<AppState>,
    payload: Payload<SignupRequest>,
) -> Result<ApiResponse<SessionBody>, ApiError> {
    let Payload { body, image } = payload;
    let session = state
        .users
        .signup(NewUser {
            name: body.name,
            email: body.email,
            password: body.password,
            image,
        })
        .await?;

    Ok(ApiResponse::created(session.into()))
}

/// POST /api/users/signin
pub async fn signin(
    State(state): State<AppState>,
    payload: Payload<SigninRequest>,
) -> Result<ApiResponse<SessionBody>, ApiError> {
    let body = payload.body;
    let session = state.users.signin(&body.email, &body.password).await?;
    Ok(ApiResponse::success(session.into()))
}
