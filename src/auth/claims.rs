//! Token claims.

use serde::{Deserialize, Serialize};

/// Signed claim set carried by both access and refresh tokens.
///
/// Deliberately minimal: the subject (user ID), the expiry, and a random
/// token ID. The `jti` makes every issuance distinct, which the refresh-token
/// store relies on (token strings are unique, and rotation must produce a
/// string that differs from the one it replaces). No scope or role claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Token ID.
    pub jti: String,
}
