use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, expiry: Duration) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            email,
            exp: (now + expiry).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
    InvalidExpiry(u64),
    Expired,
    Invalid(String),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
            JwtError::InvalidExpiry(hours) => write!(
                f,
                "JWT expiry must be between 1 and {} hours, got {}",
                MAX_EXPIRY_HOURS, hours
            ),
            JwtError::Expired => write!(f, "JWT token has expired"),
            JwtError::Invalid(msg) => write!(f, "Invalid JWT token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Longest token lifetime accepted from configuration (one year)
pub const MAX_EXPIRY_HOURS: u64 = 24 * 366;

/// Issues and verifies signed identity tokens against one server-held secret.
/// Nothing about a token is stored; validity is signature plus expiry.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<Keys>,
    expiry: Duration,
}

impl TokenService {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        if expiry_hours == 0 || expiry_hours > MAX_EXPIRY_HOURS {
            return Err(JwtError::InvalidExpiry(expiry_hours));
        }

        Ok(Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            expiry: Duration::hours(expiry_hours as i64),
        })
    }

    /// Sign a token binding the user id and email
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, JwtError> {
        let claims = Claims::new(user_id, email.to_string(), self.expiry);
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::default(), claims, &self.keys.encoding)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    /// Check signature and expiry, returning the decoded claims
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })
    }
}
