use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Place {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    /// Owning user; fixed at creation
    pub creator: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Place {
    pub fn new(
        title: String,
        description: String,
        address: String,
        location: Coordinates,
        creator: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            address,
            lat: location.lat,
            lng: location.lng,
            image_url: None,
            image_public_id: None,
            creator,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn location(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.creator == user_id
    }
}
