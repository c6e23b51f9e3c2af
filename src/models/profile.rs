//! Profile model for storage.

use serde::{Deserialize, Serialize};

use crate::schemas::ProfileFields;

#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A member profile stored in Firestore.
///
/// At most one exists per account; `owner_id` is the account uid and the
/// document id is a generated record id, so profiles stay addressable even
/// if account ids are rotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Profile {
    /// Record id (also the document ID)
    pub id: String,
    /// Owning account uid
    pub owner_id: String,
    pub display_name: String,
    pub username: String,
    /// Contact email, fixed at creation
    pub email: String,
    /// Optional, exactly 10 characters when present
    pub phone_number: Option<String>,
    pub description: String,
    pub degree: String,
    /// Field of study, optional
    pub field: Option<String>,
    pub institute: String,
    pub grade: String,
    /// Education start date (YYYY-MM-DD)
    pub start_date: String,
    /// Education end date (YYYY-MM-DD), strictly after `start_date`
    pub end_date: String,
    /// Public URL of the profile image in the media store
    pub image: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Profile {
    /// Build a new profile from validated fields.
    ///
    /// `created_at` and `updated_at` start out equal.
    pub fn from_fields(id: String, owner_id: String, fields: &ProfileFields, now: &str) -> Self {
        Self {
            id,
            owner_id,
            display_name: fields.display_name.clone(),
            username: fields.username.clone(),
            email: fields.email.clone(),
            phone_number: fields.phone_number.clone(),
            description: fields.description.clone(),
            degree: fields.degree.clone(),
            field: fields.field.clone(),
            institute: fields.institute.clone(),
            grade: fields.grade.clone(),
            start_date: fields.start_date.to_string(),
            end_date: fields.end_date.to_string(),
            image: fields.image.clone(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Overwrite the mutable fields and refresh `updated_at`.
    ///
    /// `id`, `owner_id`, `email`, and `created_at` never change here.
    pub fn apply_fields(&mut self, fields: &ProfileFields, now: &str) {
        self.display_name = fields.display_name.clone();
        self.username = fields.username.clone();
        self.phone_number = fields.phone_number.clone();
        self.description = fields.description.clone();
        self.degree = fields.degree.clone();
        self.field = fields.field.clone();
        self.institute = fields.institute.clone();
        self.grade = fields.grade.clone();
        self.start_date = fields.start_date.to_string();
        self.end_date = fields.end_date.to_string();
        self.image = fields.image.clone();
        self.updated_at = now.to_string();
    }
}
