// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (account documents, keyed by identity uid)
//! - Profiles (member profiles, one per account)
//! - Profile owner markers (create-only uniqueness guards)

use serde::{Deserialize, Serialize};

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Profile, User};
use crate::schemas::ProfileFields;
use crate::time_utils::now_rfc3339;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Create-only marker document that makes the one-profile-per-account rule
/// a storage guarantee rather than a read-then-write check.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OwnerMarker {
    profile_id: String,
    created_at: String,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user account by identity uid.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user account document.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Create a profile for `owner_id`, enforcing at most one per account.
    ///
    /// Uniqueness is guaranteed by a create-only marker document keyed by the
    /// owner uid: two concurrent creates race on the marker insert and the
    /// loser gets the store's already-exists conflict. The preceding query is
    /// only a fast path for the common sequential duplicate.
    pub async fn create_profile(
        &self,
        owner_id: &str,
        fields: &ProfileFields,
    ) -> Result<Profile, AppError> {
        const ALREADY_EXISTS: &str =
            "You already have a profile. You are not allowed to create a new one.";

        if self.get_profile_by_owner(owner_id).await?.is_some() {
            return Err(AppError::Conflict(ALREADY_EXISTS.to_string()));
        }

        let now = now_rfc3339();
        let profile = Profile::from_fields(
            uuid::Uuid::new_v4().to_string(),
            owner_id.to_string(),
            fields,
            &now,
        );

        let marker = OwnerMarker {
            profile_id: profile.id.clone(),
            created_at: now,
        };
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::PROFILE_OWNERS)
            .document_id(owner_id)
            .object(&marker)
            .execute()
            .await
            .map_err(|e| match e {
                firestore::errors::FirestoreError::DataConflictError(_) => {
                    AppError::Conflict(ALREADY_EXISTS.to_string())
                }
                other => AppError::Database(other.to_string()),
            })?;

        let inserted: Result<(), _> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::PROFILES)
            .document_id(&profile.id)
            .object(&profile)
            .execute()
            .await;

        if let Err(e) = inserted {
            // Roll the marker back so the account is not locked out of
            // creating a profile by a half-finished attempt.
            if let Err(cleanup) = self.delete_owner_marker(owner_id).await {
                tracing::error!(
                    owner_id,
                    error = %cleanup,
                    "Failed to roll back owner marker after profile insert failure"
                );
            }
            return Err(AppError::Database(e.to_string()));
        }

        tracing::info!(owner_id, profile_id = %profile.id, "Profile created");

        Ok(profile)
    }

    /// Get the profile owned by an account, if any.
    pub async fn get_profile_by_owner(&self, owner_id: &str) -> Result<Option<Profile>, AppError> {
        let owner = owner_id.to_string();
        let mut profiles: Vec<Profile> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .filter(move |q| q.field("owner_id").eq(owner.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(profiles.pop())
    }

    /// Get a profile by record id.
    pub async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(profile_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a profile by record id, visible only to its owner.
    ///
    /// A missing profile and someone else's profile produce the same
    /// NotFound, so record ids cannot be probed for existence.
    pub async fn get_profile_checked(
        &self,
        profile_id: &str,
        requester_id: &str,
    ) -> Result<Profile, AppError> {
        let not_found = || AppError::NotFound("Profile not found.".to_string());

        let profile = self.get_profile(profile_id).await?.ok_or_else(not_found)?;

        if profile.owner_id != requester_id {
            tracing::warn!(
                profile_id,
                requester_id,
                "Blocked profile access by non-owner"
            );
            return Err(not_found());
        }

        Ok(profile)
    }

    /// Apply validated fields to an owned profile.
    ///
    /// Returns the pre-update and post-update documents so callers can
    /// report what changed.
    pub async fn update_profile(
        &self,
        profile_id: &str,
        requester_id: &str,
        fields: &ProfileFields,
    ) -> Result<(Profile, Profile), AppError> {
        let before = self.get_profile(profile_id).await?.ok_or_else(|| {
            AppError::NotFound("Profile not found. Cannot update a non-existent profile.".to_string())
        })?;

        if before.owner_id != requester_id {
            tracing::warn!(
                profile_id,
                requester_id,
                "Blocked profile update by non-owner"
            );
            return Err(AppError::Forbidden(
                "You do not have permission to edit this profile.".to_string(),
            ));
        }

        if fields.email != before.email {
            return Err(AppError::Validation {
                field: "email",
                message: "Email cannot be changed after the profile is created".to_string(),
            });
        }

        let mut after = before.clone();
        after.apply_fields(fields, &now_rfc3339());

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(profile_id)
            .object(&after)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((before, after))
    }

    async fn delete_owner_marker(&self, owner_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PROFILE_OWNERS)
            .document_id(owner_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
