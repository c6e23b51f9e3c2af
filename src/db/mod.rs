//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PROFILES: &str = "profiles";
    /// Create-only markers enforcing one profile per account (keyed by uid)
    pub const PROFILE_OWNERS: &str = "profile_owners";
}
