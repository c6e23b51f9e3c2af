// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes. All of these sit behind `require_session`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::Profile;
use crate::schemas::ProfileInput;
use crate::AppState;

#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(get_own_profile).post(create_profile))
        .route("/profile/image", post(upload_image))
        .route("/profile/{id}", get(get_profile).put(update_profile))
}

/// Response for a successful profile update.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub profile: Profile,
}

/// Image upload request.
#[derive(Debug, Deserialize)]
pub struct ImageUploadBody {
    /// Data-URI encoded image
    image: String,
    /// Raw size in bytes, as measured by the client before encoding
    size: u64,
    /// URL of the image being replaced, if any
    #[serde(default)]
    previous: Option<String>,
}

/// Image upload response.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ImageUploadResponse {
    pub url: String,
}

/// Fetch the signed-in user's own profile.
async fn get_own_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Profile>> {
    let profile = state
        .db
        .get_profile_by_owner(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("No profile exists for this account.".to_string()))?;

    Ok(Json(profile))
}

/// Create the signed-in user's profile. One per account.
async fn create_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ProfileInput>,
) -> Result<impl IntoResponse> {
    let fields = input.validate()?;

    let profile = state.db.create_profile(&user.uid, &fields).await?;

    tracing::info!(uid = %user.uid, profile_id = %profile.id, "Profile created");

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Fetch a profile by record id. Only the owner can see it.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Profile>> {
    let profile = state.db.get_profile_checked(&id, &user.uid).await?;

    Ok(Json(profile))
}

/// Update a profile and notify its owner by email.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(input): Json<ProfileInput>,
) -> Result<Json<UpdateProfileResponse>> {
    let fields = input.validate()?;

    let (before, after) = state.db.update_profile(&id, &user.uid, &fields).await?;

    tracing::info!(uid = %user.uid, profile_id = %after.id, "Profile updated");

    // Notification is best-effort; the update already happened
    if let Err(err) = state.notifier.notify_profile_updated(&before, &after).await {
        tracing::warn!(error = %err, profile_id = %after.id, "Profile-update email failed");
    }

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully.".to_string(),
        profile: after,
    }))
}

/// Upload a profile image, replacing the previous one when given.
async fn upload_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ImageUploadBody>,
) -> Result<Json<ImageUploadResponse>> {
    // Dropping the old image is best-effort; a stale copy in the media
    // store must never block the new upload
    if let Some(previous) = body.previous.as_deref().filter(|p| !p.is_empty()) {
        if let Err(err) = state.media.delete_by_url(previous).await {
            tracing::warn!(uid = %user.uid, error = %err, "Failed to delete previous image");
        }
    }

    let url = state.media.upload(&body.image, body.size).await?;

    tracing::info!(uid = %user.uid, "Profile image uploaded");

    Ok(Json(ImageUploadResponse { url }))
}
