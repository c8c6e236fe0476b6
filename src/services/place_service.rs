use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::models::Place;
use crate::database::{Store, StoreTransaction};
use crate::services::geocoding::Geocoder;
use crate::services::media::{ImageUpload, MediaStore};
use crate::services::ServiceError;

pub struct NewPlace {
    pub title: String,
    pub description: String,
    pub address: String,
    pub image: Option<ImageUpload>,
}

/// The only place fields that may change after creation
pub struct PlaceChanges {
    pub title: String,
    pub description: String,
}

/// Place lifecycle. Keeps `place.creator` and the owner's `places`
/// collection in step: both sides are written in one transaction on create
/// and on delete, and a failed transaction leaves neither side changed.
#[derive(Clone)]
pub struct PlaceService {
    store: Arc<dyn Store>,
    geocoder: Arc<dyn Geocoder>,
    media: Arc<dyn MediaStore>,
    image_folder: String,
}

impl PlaceService {
    pub fn new(
        store: Arc<dyn Store>,
        geocoder: Arc<dyn Geocoder>,
        media: Arc<dyn MediaStore>,
        image_folder: impl Into<String>,
    ) -> Self {
        Self {
            store,
            geocoder,
            media,
            image_folder: image_folder.into(),
        }
    }

    pub async fn create(&self, creator_id: Uuid, input: NewPlace) -> Result<Place, ServiceError> {
        let location = self.geocoder.resolve(&input.address).await?;

        let creator = self
            .store
            .find_user(creator_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Could not find user for provided id.".to_string()))?;

        let mut place = Place::new(
            input.title,
            input.description,
            input.address,
            location,
            creator.id,
        );

        let stored = match &input.image {
            Some(image) => Some(self.media.store(image, &self.image_folder).await?),
            None => None,
        };
        if let Some(image) = &stored {
            place.image_url = Some(image.url.clone());
            place.image_public_id = Some(image.public_id.clone());
        }

        let mut tx = self.store.begin().await.map_err(ServiceError::Transaction)?;
        let staged = stage_create(tx.as_mut(), &place).await;
        if let Err(e) = finish(tx, staged).await {
            // the record never became visible, so its image is an orphan
            if let Some(image) = stored {
                self.release_image(&image.public_id).await;
            }
            return Err(e);
        }

        info!("Place {} created by user {}", place.id, place.creator);
        Ok(place)
    }

    pub async fn get(&self, id: Uuid) -> Result<Place, ServiceError> {
        self.store.find_place(id).await?.ok_or_else(|| {
            ServiceError::NotFound("Could not find a place for the provided id.".to_string())
        })
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Place>, ServiceError> {
        let places = self.store.places_by_creator(user_id).await?;
        if places.is_empty() {
            return Err(ServiceError::NotFound(
                "Could not find places for the provided user id.".to_string(),
            ));
        }
        Ok(places)
    }

    pub async fn update(
        &self,
        requester: Uuid,
        id: Uuid,
        changes: PlaceChanges,
    ) -> Result<Place, ServiceError> {
        let place = self.get(id).await?;
        if !place.is_owned_by(requester) {
            return Err(ServiceError::NotOwner(
                "You are not allowed to edit this place.".to_string(),
            ));
        }

        let updated = self
            .store
            .update_place_details(id, &changes.title, &changes.description)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("Could not find a place for the provided id.".to_string())
            })?;

        debug!("Place {} updated by owner {}", id, requester);
        Ok(updated)
    }

    pub async fn delete(&self, requester: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let place = self.get(id).await?;
        if !place.is_owned_by(requester) {
            return Err(ServiceError::NotOwner(
                "You are not allowed to delete this place.".to_string(),
            ));
        }

        let mut tx = self.store.begin().await.map_err(ServiceError::Transaction)?;
        let staged = stage_delete(tx.as_mut(), &place).await;
        finish(tx, staged).await?;

        // Released only after the removal commits; a failed delete keeps its image.
        if let Some(public_id) = &place.image_public_id {
            self.release_image(public_id).await;
        }

        info!("Place {} deleted by owner {}", id, requester);
        Ok(())
    }

    /// Image cleanup never fails the enclosing operation
    async fn release_image(&self, public_id: &str) {
        if let Err(e) = self.media.delete(public_id).await {
            warn!("Failed to release image {}: {}", public_id, e);
        }
    }
}

async fn stage_create(tx: &mut dyn StoreTransaction, place: &Place) -> Result<(), ServiceError> {
    tx.insert_place(place).await.map_err(ServiceError::Transaction)?;

    let attached = tx
        .attach_place(place.creator, place.id)
        .await
        .map_err(ServiceError::Transaction)?;
    if !attached {
        return Err(ServiceError::NotFound("Could not find user for provided id.".to_string()));
    }
    Ok(())
}

async fn stage_delete(tx: &mut dyn StoreTransaction, place: &Place) -> Result<(), ServiceError> {
    let deleted = tx.delete_place(place.id).await.map_err(ServiceError::Transaction)?;
    if !deleted {
        // lost a race with another delete
        return Err(ServiceError::NotFound(
            "Could not find a place for the provided id.".to_string(),
        ));
    }

    let detached = tx
        .detach_place(place.creator, place.id)
        .await
        .map_err(ServiceError::Transaction)?;
    if !detached {
        return Err(ServiceError::NotFound(
            "Could not find the owner of this place.".to_string(),
        ));
    }
    Ok(())
}

/// Commit staged writes, or roll them back and return the staging error
async fn finish(
    tx: Box<dyn StoreTransaction>,
    staged: Result<(), ServiceError>,
) -> Result<(), ServiceError> {
    match staged {
        Ok(()) => tx.commit().await.map_err(ServiceError::Transaction),
        Err(e) => {
            match tx.rollback().await {
                Ok(()) => debug!("Rolled back paired write: {}", e),
                Err(rb) => warn!("Rollback after '{}' failed: {}", e, rb),
            }
            Err(e)
        }
    }
}
