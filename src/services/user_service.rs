use std::sync::Arc;

use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::TokenService;
use crate::database::models::User;
use crate::database::{DatabaseError, Store};
use crate::services::media::{ImageUpload, MediaStore};
use crate::services::ServiceError;
use crate::validation::normalize_email;

const DUPLICATE_EMAIL: &str = "Could not create user, email already exists.";
const BAD_CREDENTIALS: &str = "Invalid credentials, could not log you in.";

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub image: Option<ImageUpload>,
}

/// Result of a successful signup or signin
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    media: Arc<dyn MediaStore>,
    tokens: TokenService,
    image_folder: String,
}

impl UserService {
    pub fn new(
        store: Arc<dyn Store>,
        media: Arc<dyn MediaStore>,
        tokens: TokenService,
        image_folder: impl Into<String>,
    ) -> Self {
        Self {
            store,
            media,
            tokens,
            image_folder: image_folder.into(),
        }
    }

    pub async fn list(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn signup(&self, input: NewUser) -> Result<AuthSession, ServiceError> {
        let email = normalize_email(&input.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(DUPLICATE_EMAIL.to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let mut user = User::new(input.name, email, password_hash);

        let stored = match &input.image {
            Some(image) => Some(self.media.store(image, &self.image_folder).await?),
            None => None,
        };
        if let Some(image) = &stored {
            user.image_url = Some(image.url.clone());
            user.image_public_id = Some(image.public_id.clone());
        }

        if let Err(e) = self.store.insert_user(&user).await {
            if let Some(image) = stored {
                if let Err(media_err) = self.media.delete(&image.public_id).await {
                    warn!("Failed to release image {}: {}", image.public_id, media_err);
                }
            }
            return Err(match e {
                // lost a race with a concurrent signup for the same email
                DatabaseError::Duplicate(_) => ServiceError::Conflict(DUPLICATE_EMAIL.to_string()),
                other => other.into(),
            });
        }

        let token = self.tokens.issue(user.id, &user.email)?;
        info!("User {} signed up", user.id);

        Ok(AuthSession {
            user_id: user.id,
            email: user.email,
            token,
        })
    }

    pub async fn signin(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        let email = normalize_email(email);

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::InvalidCredentials(BAD_CREDENTIALS.to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(ServiceError::InvalidCredentials(BAD_CREDENTIALS.to_string()));
        }

        let token = self.tokens.issue(user.id, &user.email)?;

        Ok(AuthSession {
            user_id: user.id,
            email: user.email,
            token,
        })
    }
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ServiceError::PasswordHash(format!("stored hash unreadable: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, RecordingMedia};

    fn service(store: &MemoryStore, media: Arc<RecordingMedia>) -> (UserService, TokenService) {
        let tokens = TokenService::new("test-secret", 1).unwrap();
        let service = UserService::new(Arc::new(store.clone()), media, tokens.clone(), "users");
        (service, tokens)
    }

    fn ann() -> NewUser {
        NewUser {
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            password: "password".to_string(),
            image: None,
        }
    }

    #[tokio::test]
    async fn signup_then_signin_round_trip() {
        let store = MemoryStore::new();
        let (users, tokens) = service(&store, Arc::new(RecordingMedia::new()));

        let created = users.signup(ann()).await.unwrap();
        let claims = tokens.verify(&created.token).unwrap();
        assert_eq!(claims.user_id, created.user_id);
        assert_eq!(claims.email, "ann@x.com");

        let session = users.signin("ann@x.com", "password").await.unwrap();
        let claims = tokens.verify(&session.token).unwrap();
        assert_eq!(claims.user_id, created.user_id);
        assert_eq!(claims.email, created.email);
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let store = MemoryStore::new();
        let (users, _) = service(&store, Arc::new(RecordingMedia::new()));

        let created = users.signup(ann()).await.unwrap();
        let stored = store.user(created.user_id).unwrap();

        assert_ne!(stored.password_hash, "password");
        assert!(stored.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn signin_rejects_wrong_password_and_unknown_email() {
        let store = MemoryStore::new();
        let (users, _) = service(&store, Arc::new(RecordingMedia::new()));
        users.signup(ann()).await.unwrap();

        assert!(matches!(
            users.signin("ann@x.com", "wrong-password").await,
            Err(ServiceError::InvalidCredentials(_))
        ));
        assert!(matches!(
            users.signin("nobody@x.com", "password").await,
            Err(ServiceError::InvalidCredentials(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        let (users, _) = service(&store, Arc::new(RecordingMedia::new()));
        users.signup(ann()).await.unwrap();

        let mut again = ann();
        again.email = " ANN@x.com".to_string();
        let err = users.signup(again).await.unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(msg) if msg == DUPLICATE_EMAIL));
        assert_eq!(users.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn signup_image_goes_to_user_folder() {
        let store = MemoryStore::new();
        let media = Arc::new(RecordingMedia::new());
        let (users, _) = service(&store, media.clone());

        let mut input = ann();
        input.image = Some(ImageUpload {
            file_name: "ann.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![0xff, 0xd8],
        });
        let created = users.signup(input).await.unwrap();

        assert_eq!(media.stored_folders(), vec!["users".to_string()]);
        let stored = store.user(created.user_id).unwrap();
        assert!(stored.image_url.is_some());
        assert!(stored.image_public_id.unwrap().starts_with("users/"));
    }

    #[tokio::test]
    async fn failed_image_upload_creates_no_user() {
        let store = MemoryStore::new();
        let (users, _) = service(&store, Arc::new(RecordingMedia::failing_store()));

        let mut input = ann();
        input.image = Some(ImageUpload {
            file_name: "ann.jpg".to_string(),
            content_type: None,
            bytes: vec![1],
        });

        assert!(matches!(users.signup(input).await, Err(ServiceError::Media(_))));
        assert!(users.list().await.unwrap().is_empty());
    }
}
