// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media store client for profile image upload and deletion.
//!
//! Uploads land in a fixed folder and are addressed afterwards only by
//! their public URL; deletion derives the store's public id back out of
//! that URL. Requests are authenticated with a SHA-256 signature over the
//! sorted parameters.

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Maximum accepted image payload, checked before any provider call.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Folder all profile images are stored under.
pub const UPLOAD_FOLDER: &str = "profile_images";

const MEDIA_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

#[derive(Clone)]
struct MediaCredentials {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

/// Media store client.
#[derive(Clone)]
pub struct MediaService {
    http: reqwest::Client,
    base_url: String,
    /// None means offline mock mode
    credentials: Option<MediaCredentials>,
}

impl MediaService {
    /// Create a new media service from store credentials.
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: MEDIA_BASE_URL.to_string(),
            credentials: Some(MediaCredentials {
                cloud_name,
                api_key,
                api_secret,
            }),
        }
    }

    /// Create a mock media service for testing (offline mode).
    ///
    /// Uploads return a deterministic-shape URL under the usual folder and
    /// deletions succeed without any network traffic.
    #[cfg(debug_assertions)]
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: MEDIA_BASE_URL.to_string(),
            credentials: None,
        }
    }

    /// Upload an encoded image (data URI) and return its public URL.
    ///
    /// `byte_size` is the decoded size reported by the client; anything
    /// over the cap is rejected here, before the store is contacted.
    pub async fn upload(&self, encoded_image: &str, byte_size: u64) -> Result<String, AppError> {
        if encoded_image.is_empty() {
            return Err(AppError::BadRequest("No image uploaded".to_string()));
        }

        if byte_size > MAX_IMAGE_BYTES {
            return Err(AppError::TooLarge);
        }

        // Mock mode (Debug builds only)
        #[cfg(debug_assertions)]
        {
            if self.credentials.is_none() {
                return Ok(format!(
                    "https://res.cloudinary.com/mock/image/upload/v1/{}/{}.png",
                    UPLOAD_FOLDER,
                    uuid::Uuid::new_v4()
                ));
            }
        }

        let creds = self.get_credentials()?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_request(
            &[("folder", UPLOAD_FOLDER), ("timestamp", &timestamp)],
            &creds.api_secret,
        );

        let url = format!("{}/{}/image/upload", self.base_url, creds.cloud_name);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("file", encoded_image),
                ("folder", UPLOAD_FOLDER),
                ("timestamp", timestamp.as_str()),
                ("api_key", creds.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Image upload request failed: {e}")))?;

        let uploaded: UploadResponse = check_media_json(response).await?;

        tracing::info!(public_id = %uploaded.public_id, "Image uploaded");

        Ok(uploaded.secure_url)
    }

    /// Delete a previously uploaded image, addressed by its public URL.
    ///
    /// Callers treat failures as non-fatal: a stale image in the store is
    /// preferable to blocking the replacement upload.
    pub async fn delete_by_url(&self, url: &str) -> Result<(), AppError> {
        let Some(public_id) = public_id_from_url(url) else {
            return Err(AppError::BadRequest(format!(
                "Could not derive a public id from {url}"
            )));
        };

        // Mock mode (Debug builds only)
        #[cfg(debug_assertions)]
        {
            if self.credentials.is_none() {
                tracing::debug!(public_id, "Mock image delete");
                return Ok(());
            }
        }

        let creds = self.get_credentials()?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_request(
            &[("public_id", public_id.as_str()), ("timestamp", &timestamp)],
            &creds.api_secret,
        );

        let endpoint = format!("{}/{}/image/destroy", self.base_url, creds.cloud_name);
        let response = self
            .http
            .post(&endpoint)
            .form(&[
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", creds.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Image delete request failed: {e}")))?;

        let deleted: DestroyResponse = check_media_json(response).await?;

        if deleted.result != "ok" {
            return Err(AppError::Upstream(format!(
                "Image delete rejected for {public_id}: {}",
                deleted.result
            )));
        }

        tracing::info!(public_id, "Image deleted");
        Ok(())
    }

    fn get_credentials(&self) -> Result<&MediaCredentials, AppError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| AppError::Upstream("Media store not configured (offline mode)".to_string()))
    }
}

/// Derive the store's public id from a delivery URL.
///
/// The id is everything after the `upload` path segment, minus an optional
/// version segment (`v` + digits) and the file extension. Returns None when
/// the URL does not look like a store delivery URL.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let parts: Vec<&str> = url.split('/').collect();
    let upload_idx = parts.iter().position(|p| *p == "upload")?;

    let mut rest = &parts[upload_idx + 1..];
    if let Some(first) = rest.first() {
        let is_version = first.len() > 1
            && first.starts_with('v')
            && first[1..].chars().all(|c| c.is_ascii_digit());
        if is_version {
            rest = &rest[1..];
        }
    }

    if rest.is_empty() || rest.iter().any(|p| p.is_empty()) {
        return None;
    }

    let joined = rest.join("/");
    let public_id = match joined.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.is_empty() && !ext.contains('/') => {
            base.to_string()
        }
        _ => joined,
    };

    if public_id.is_empty() {
        return None;
    }

    Some(public_id)
}

/// SHA-256 request signature over the sorted parameter string.
fn sign_request(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort_by_key(|(name, _)| *name);

    let to_sign = sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

async fn check_media_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!("HTTP {status}: {body}")));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("JSON parse error: {e}")))
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}
