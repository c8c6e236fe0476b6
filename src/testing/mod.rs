//! In-memory stand-ins for the storage, geocoding and media collaborators.
//! Each instance owns its own tables; nothing is shared between tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::models::{Coordinates, Place, User};
use crate::database::{DatabaseError, Store, StoreTransaction};
use crate::services::{GeocodeError, Geocoder, ImageUpload, MediaError, MediaStore, StoredImage};

/// Points at which a [`MemoryStore`] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Begin,
    AttachPlace,
    DetachPlace,
    Commit,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    places: HashMap<Uuid, Place>,
}

/// Transactional in-memory store. Staged writes are applied under one lock
/// at commit time, so readers never see half of a paired write.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Mutex<HashSet<Fault>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&self, fault: Fault) {
        self.faults.lock().unwrap().insert(fault);
    }

    fn check(&self, fault: Fault) -> Result<(), DatabaseError> {
        if self.faults.lock().unwrap().contains(&fault) {
            return Err(DatabaseError::QueryError(format!("injected fault: {:?}", fault)));
        }
        Ok(())
    }

    /// Insert a user directly, bypassing signup
    pub fn seed_user(&self, name: &str, email: &str) -> User {
        let user = User::new(name.to_string(), email.to_string(), "not-a-real-hash".to_string());
        self.tables.lock().unwrap().users.insert(user.id, user.clone());
        user
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.tables.lock().unwrap().users.get(&id).cloned()
    }

    pub fn place(&self, id: Uuid) -> Option<Place> {
        self.tables.lock().unwrap().places.get(&id).cloned()
    }

    pub fn place_count(&self) -> usize {
        self.tables.lock().unwrap().places.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let mut users: Vec<User> = self.tables.lock().unwrap().users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate("email".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_place(&self, id: Uuid) -> Result<Option<Place>, DatabaseError> {
        Ok(self.place(id))
    }

    async fn places_by_creator(&self, creator: Uuid) -> Result<Vec<Place>, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        let mut places: Vec<Place> = tables
            .places
            .values()
            .filter(|p| p.creator == creator)
            .cloned()
            .collect();
        places.sort_by_key(|p| p.created_at);
        Ok(places)
    }

    async fn update_place_details(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Option<Place>, DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.places.get_mut(&id).map(|place| {
            place.title = title.to_string();
            place.description = description.to_string();
            place.updated_at = chrono::Utc::now();
            place.clone()
        }))
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError> {
        self.check(Fault::Begin)?;
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }
}

enum Staged {
    InsertPlace(Place),
    DeletePlace(Uuid),
    Attach { user: Uuid, place: Uuid },
    Detach { user: Uuid, place: Uuid },
}

pub struct MemoryTransaction {
    store: MemoryStore,
    staged: Vec<Staged>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_place(&mut self, place: &Place) -> Result<(), DatabaseError> {
        self.staged.push(Staged::InsertPlace(place.clone()));
        Ok(())
    }

    async fn delete_place(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        if self.store.place(id).is_none() {
            return Ok(false);
        }
        self.staged.push(Staged::DeletePlace(id));
        Ok(true)
    }

    async fn attach_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<bool, DatabaseError> {
        self.store.check(Fault::AttachPlace)?;
        if self.store.user(user_id).is_none() {
            return Ok(false);
        }
        self.staged.push(Staged::Attach { user: user_id, place: place_id });
        Ok(true)
    }

    async fn detach_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<bool, DatabaseError> {
        self.store.check(Fault::DetachPlace)?;
        if self.store.user(user_id).is_none() {
            return Ok(false);
        }
        self.staged.push(Staged::Detach { user: user_id, place: place_id });
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let MemoryTransaction { store, staged } = *self;
        store.check(Fault::Commit)?;
        let mut tables = store.tables.lock().unwrap();

        // a concurrent transaction may have removed what we are about to delete
        for op in &staged {
            if let Staged::DeletePlace(id) = op {
                if !tables.places.contains_key(id) {
                    return Err(DatabaseError::QueryError(format!(
                        "place {} deleted concurrently",
                        id
                    )));
                }
            }
        }

        for op in staged {
            match op {
                Staged::InsertPlace(place) => {
                    tables.places.insert(place.id, place);
                }
                Staged::DeletePlace(id) => {
                    tables.places.remove(&id);
                }
                Staged::Attach { user, place } => {
                    if let Some(user) = tables.users.get_mut(&user) {
                        if !user.places.contains(&place) {
                            user.places.push(place);
                        }
                    }
                }
                Staged::Detach { user, place } => {
                    if let Some(user) = tables.users.get_mut(&user) {
                        user.places.retain(|p| *p != place);
                    }
                }
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Geocoder returning one fixed answer
pub struct FixedGeocoder {
    outcome: Result<Coordinates, GeocodeError>,
}

impl FixedGeocoder {
    pub fn at(location: Coordinates) -> Self {
        Self { outcome: Ok(location) }
    }

    pub fn failing(error: GeocodeError) -> Self {
        Self { outcome: Err(error) }
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn resolve(&self, _address: &str) -> Result<Coordinates, GeocodeError> {
        self.outcome.clone()
    }
}

/// Media store that remembers what it was asked to do
#[derive(Default)]
pub struct RecordingMedia {
    fail_store: bool,
    fail_delete: bool,
    stored: Mutex<Vec<(String, StoredImage)>>,
    deleted: Mutex<Vec<String>>,
}

impl RecordingMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_store() -> Self {
        Self {
            fail_store: true,
            ..Self::default()
        }
    }

    pub fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Self::default()
        }
    }

    pub fn stored_folders(&self) -> Vec<String> {
        self.stored.lock().unwrap().iter().map(|(f, _)| f.clone()).collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for RecordingMedia {
    async fn store(&self, image: &ImageUpload, folder: &str) -> Result<StoredImage, MediaError> {
        if self.fail_store {
            return Err(MediaError::Upstream("upload refused".to_string()));
        }
        let public_id = format!("{}/{}", folder, Uuid::new_v4().simple());
        let stored = StoredImage {
            url: format!("https://media.test/{}/{}", public_id, image.file_name),
            public_id,
        };
        self.stored
            .lock()
            .unwrap()
            .push((folder.to_string(), stored.clone()));
        Ok(stored)
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        if self.fail_delete {
            return Err(MediaError::Upstream("destroy refused".to_string()));
        }
        self.deleted.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}
