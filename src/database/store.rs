//! Storage seam used by the services.
//!
//! Single-document reads and writes go straight through [`Store`]. Writes
//! that touch a place and its owner together go through a
//! [`StoreTransaction`], which makes them visible only on `commit`.

use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Place, User};

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Fails with [`DatabaseError::Duplicate`] when the email is taken
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    async fn find_place(&self, id: Uuid) -> Result<Option<Place>, DatabaseError>;

    async fn places_by_creator(&self, creator: Uuid) -> Result<Vec<Place>, DatabaseError>;

    /// Overwrite title and description; `None` if the place no longer exists
    async fn update_place_details(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Option<Place>, DatabaseError>;

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError>;
}

/// Writes staged here are invisible to other readers until `commit`.
/// Dropping without committing discards them.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn insert_place(&mut self, place: &Place) -> Result<(), DatabaseError>;

    /// `false` when no such place exists
    async fn delete_place(&mut self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Add the place to the user's collection; `false` when the user is gone
    async fn attach_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<bool, DatabaseError>;

    /// Remove the place from the user's collection; `false` when the user is gone
    async fn detach_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<bool, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}
