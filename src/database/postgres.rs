use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{Place, User};
use super::store::{Store, StoreTransaction};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, image_url, image_public_id, places, created_at";

const PLACE_COLUMNS: &str = "id, title, description, address, lat, lng, image_url, \
     image_public_id, creator, created_at, updated_at";

/// [`Store`] backed by PostgreSQL. The owned-place collection lives in
/// `users.places` (uuid[]) and is kept in step with `places.creator` by the
/// transactional writes below.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, image_url, image_public_id, places, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.image_url)
        .bind(&user.image_public_id)
        .bind(&user.places)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "email"))?;
        Ok(())
    }

    async fn find_place(&self, id: Uuid) -> Result<Option<Place>, DatabaseError> {
        let sql = format!("SELECT {} FROM places WHERE id = $1", PLACE_COLUMNS);
        let place = sqlx::query_as::<_, Place>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(place)
    }

    async fn places_by_creator(&self, creator: Uuid) -> Result<Vec<Place>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM places WHERE creator = $1 ORDER BY created_at",
            PLACE_COLUMNS
        );
        let places = sqlx::query_as::<_, Place>(&sql)
            .bind(creator)
            .fetch_all(&self.pool)
            .await?;
        Ok(places)
    }

    async fn update_place_details(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Option<Place>, DatabaseError> {
        let sql = format!(
            "UPDATE places SET title = $2, description = $3, updated_at = now()
             WHERE id = $1 RETURNING {}",
            PLACE_COLUMNS
        );
        let place = sqlx::query_as::<_, Place>(&sql)
            .bind(id)
            .bind(title)
            .bind(description)
            .fetch_optional(&self.pool)
            .await?;
        Ok(place)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn insert_place(&mut self, place: &Place) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO places (id, title, description, address, lat, lng, image_url, image_public_id, creator, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(place.id)
        .bind(&place.title)
        .bind(&place.description)
        .bind(&place.address)
        .bind(place.lat)
        .bind(place.lng)
        .bind(&place.image_url)
        .bind(&place.image_public_id)
        .bind(place.creator)
        .bind(place.created_at)
        .bind(place.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DatabaseError::from_write(e, "id"))?;
        Ok(())
    }

    async fn delete_place(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM places WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn attach_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<bool, DatabaseError> {
        // row lock on the user serialises concurrent attach/detach for one owner
        let result = sqlx::query(
            "UPDATE users SET places = array_append(array_remove(places, $2), $2) WHERE id = $1",
        )
        .bind(user_id)
        .bind(place_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn detach_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE users SET places = array_remove(places, $2) WHERE id = $1")
            .bind(user_id)
            .bind(place_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
