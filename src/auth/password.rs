//! Password hashing.

use anyhow::{Context, Result};

/// Digest marker stored for federated accounts. Not a valid bcrypt hash, so
/// verification can never succeed: these accounts authenticate only by
/// repeating the federation flow.
pub const FEDERATED_SENTINEL: &str = "!federated";

/// Hash a password using bcrypt.
pub fn hash(password: &str) -> Result<String> {
    // Lower cost factor in debug builds for test speed.
    let cost = if cfg!(debug_assertions) { 4 } else { bcrypt::DEFAULT_COST };
    bcrypt::hash(password, cost).context("hashing password")
}

/// Verify a password against a stored digest. A malformed digest (including
/// the federated sentinel) never verifies.
pub fn verify(password: &str, digest: &str) -> bool {
    bcrypt::verify(password, digest).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let digest = hash("correct horse").unwrap();
        assert!(verify("correct horse", &digest));
        assert!(!verify("wrong horse", &digest));
    }

    #[test]
    fn sentinel_never_verifies() {
        assert!(!verify("", FEDERATED_SENTINEL));
        assert!(!verify("!federated", FEDERATED_SENTINEL));
        assert!(!verify("anything at all", FEDERATED_SENTINEL));
    }
}
