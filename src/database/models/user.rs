use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Account row. `places` is the owned-place collection that must mirror
/// every place whose `creator` is this user.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    pub places: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            image_url: None,
            image_public_id: None,
            places: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn owns(&self, place_id: Uuid) -> bool {
        self.places.contains(&place_id)
    }
}
