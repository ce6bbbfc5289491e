//! Refresh token data model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored refresh token. One row per rotation chain: rotation overwrites
/// `token` and `expires_at` in place, revocation flips `revoked` and keeps
/// the row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    /// Unique record ID. Stable across rotations of the chain.
    pub id: String,
    /// Owning user ID. Lookup reference only, no cascade.
    pub user_id: String,
    /// The current token string. Unique.
    pub token: String,
    /// Expiry as RFC 3339.
    pub expires_at: String,
    pub created_at: String,
    pub revoked: bool,
}
