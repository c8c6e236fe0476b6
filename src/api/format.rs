use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{Coordinates, Place, User};

/// Public wire format of a place. Image deletion handles stay server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub address: String,
    pub location: Coordinates,
    pub image: Option<String>,
    pub creator: Uuid,
}

impl From<Place> for PlaceView {
    fn from(place: Place) -> Self {
        Self {
            location: place.location(),
            id: place.id,
            title: place.title,
            description: place.description,
            address: place.address,
            image: place.image_url,
            creator: place.creator,
        }
    }
}

/// Public wire format of a user; never carries the password hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub places: Vec<Uuid>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image_url,
            places: user.places,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlaceBody {
    pub place: PlaceView,
}

#[derive(Debug, Serialize)]
pub struct PlacesBody {
    pub places: Vec<PlaceView>,
}

#[derive(Debug, Serialize)]
pub struct UsersBody {
    pub users: Vec<UserView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBody {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

pub fn place_body(place: Place) -> PlaceBody {
    PlaceBody {
        place: place.into(),
    }
}

pub fn places_body(places: Vec<Place>) -> PlacesBody {
    PlacesBody {
        places: places.into_iter().map(PlaceView::from).collect(),
    }
}

pub fn users_body(users: Vec<User>) -> UsersBody {
    UsersBody {
        users: users.into_iter().map(UserView::from).collect(),
    }
}
