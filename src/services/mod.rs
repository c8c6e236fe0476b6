pub mod geocoding;
pub mod media;
pub mod place_service;
pub mod user_service;

pub use geocoding::{DisabledGeocoder, GeocodeError, Geocoder, GoogleGeocoder};
pub use media::{CloudinaryMedia, DisabledMedia, ImageUpload, MediaError, MediaStore, StoredImage};
pub use place_service::{NewPlace, PlaceChanges, PlaceService};
pub use user_service::{AuthSession, NewUser, UserService};

use thiserror::Error;

use crate::auth::JwtError;
use crate::database::DatabaseError;

/// Failure kinds shared by every domain operation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Not owner: {0}")]
    NotOwner(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("Transaction aborted: {0}")]
    Transaction(DatabaseError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}
