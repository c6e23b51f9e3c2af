//! User account model for storage.

use serde::{Deserialize, Serialize};

/// User account document stored in Firestore, keyed by the identity
/// provider's subject id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Identity provider subject id (also used as document ID)
    pub uid: String,
    /// Email address (may be None for some social providers)
    pub email: Option<String>,
    /// Display name from the identity claims
    pub display_name: Option<String>,
    /// Avatar URL from the identity claims
    pub picture: Option<String>,
    /// Authorization role, "user" on creation
    pub role: String,
    /// Whether the provider has verified the email
    pub email_verified: bool,
    /// When the account was first seen
    pub created_at: String,
    /// Last sign-in timestamp
    pub last_login_at: String,
}
