//! User data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user record as stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user ID (opaque, immutable).
    pub id: String,
    /// Unique username.
    pub username: String,
    /// Unique email address.
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_no: Option<String>,
    /// Password digest. Never the plaintext.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub is_deleted: bool,
    /// RFC 3339 timestamps.
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Whether the account may authenticate. Soft-deleted or deactivated
    /// accounts are rejected on every path.
    pub fn is_usable(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    /// Public view of this user.
    pub fn to_view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            contact_no: self.contact_no.clone(),
            is_verified: self.is_verified,
            is_active: self.is_active,
            is_deleted: self.is_deleted,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Fields for creating a user. The password arrives already hashed;
/// hashing happens in the service layer.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_no: Option<String>,
    pub password_hash: String,
}

/// Public user representation returned by the API. Excludes the digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_no: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}
