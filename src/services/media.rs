use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media hosting is not configured")]
    NotConfigured,

    #[error("media upstream failure: {0}")]
    Upstream(String),

    #[error("media host rejected request: {0}")]
    Rejected(String),
}

/// Binary image received with a request
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Where an uploaded image lives, plus the handle needed to delete it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(&self, image: &ImageUpload, folder: &str) -> Result<StoredImage, MediaError>;

    async fn delete(&self, public_id: &str) -> Result<(), MediaError>;
}

/// Cloudinary upload API client using signed requests
pub struct CloudinaryMedia {
    client: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryMedia {
    pub fn new(
        base_url: &str,
        cloud_name: &str,
        api_key: &str,
        api_secret: &str,
        timeout: Duration,
    ) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::Upstream(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.base_url, self.cloud_name, action)
    }

    /// Form carrying api_key, timestamp, the signed params and their signature
    fn signed_form(&self, params: &[(&str, String)]) -> Form {
        let timestamp = Utc::now().timestamp().to_string();
        let mut signed: Vec<(&str, String)> = params.to_vec();
        signed.push(("timestamp", timestamp));
        let signature = sign(&signed, &self.api_secret);

        signed
            .into_iter()
            .fold(Form::new(), |form, (k, v)| form.text(k.to_string(), v))
            .text("api_key", self.api_key.clone())
            .text("signature_algorithm", "sha256")
            .text("signature", signature)
    }

    async fn send(&self, action: &str, form: Form) -> Result<CloudinaryResponse, MediaError> {
        let response = self
            .client
            .post(self.endpoint(action))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MediaError::Upstream("request timed out".to_string())
                } else {
                    MediaError::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(MediaError::Upstream(format!("HTTP {}", status)));
        }

        let body: CloudinaryResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Upstream(format!("unreadable response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(MediaError::Rejected(error.message));
        }
        if !status.is_success() {
            return Err(MediaError::Upstream(format!("HTTP {}", status)));
        }
        Ok(body)
    }
}

#[async_trait]
impl MediaStore for CloudinaryMedia {
    async fn store(&self, image: &ImageUpload, folder: &str) -> Result<StoredImage, MediaError> {
        let mut part = Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
        if let Some(content_type) = &image.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| MediaError::Rejected(e.to_string()))?;
        }

        let form = self
            .signed_form(&[("folder", folder.to_string())])
            .part("file", part);

        let body = self.send("upload", form).await?;
        match (body.secure_url, body.public_id) {
            (Some(url), Some(public_id)) => Ok(StoredImage { url, public_id }),
            _ => Err(MediaError::Upstream("upload response missing url or public_id".to_string())),
        }
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        let form = self.signed_form(&[
            ("invalidate", "true".to_string()),
            ("public_id", public_id.to_string()),
        ]);

        let body = self.send("destroy", form).await?;
        match body.result.as_deref() {
            Some("ok") | Some("not found") => Ok(()),
            Some(other) => Err(MediaError::Rejected(other.to_string())),
            None => Err(MediaError::Upstream("destroy response missing result".to_string())),
        }
    }
}

/// Stand-in used when media credentials are absent
pub struct DisabledMedia;

#[async_trait]
impl MediaStore for DisabledMedia {
    async fn store(&self, _image: &ImageUpload, _folder: &str) -> Result<StoredImage, MediaError> {
        Err(MediaError::NotConfigured)
    }

    async fn delete(&self, _public_id: &str) -> Result<(), MediaError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
    result: Option<String>,
    error: Option<CloudinaryError>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryError {
    message: String,
}

/// Sorted `k=v` pairs joined by `&`, secret appended, SHA-256 hex
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
