//! Signed token issuance and verification.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::debug;

use super::claims::Claims;
use crate::config::AuthConfig;

/// Verification failures, kept distinct for diagnosability. Callers at the
/// HTTP boundary collapse both into a uniform credential failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    InvalidSignature,
}

/// Issues and verifies HS256-signed access and refresh tokens.
///
/// The signing key is fixed at startup. Rotating it invalidates every token
/// issued before the rotation; there is no key versioning.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer with explicit lifetimes.
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Create an issuer from configuration.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let secret = config
            .secret_key
            .as_deref()
            .context("auth.secret_key is not configured")?;

        Ok(Self::new(
            secret,
            Duration::minutes(config.access_ttl_minutes as i64),
            Duration::days(config.refresh_ttl_days as i64),
        ))
    }

    /// Issue a short-lived access token for the given subject.
    pub fn issue_access_token(&self, subject: &str) -> Result<String> {
        self.issue(subject, self.access_ttl).map(|(token, _)| token)
    }

    /// Issue a refresh token for the given subject, returning the token and
    /// its expiry.
    pub fn issue_refresh_token(&self, subject: &str) -> Result<(String, DateTime<Utc>)> {
        self.issue(subject, self.refresh_ttl)
    }

    fn issue(&self, subject: &str, ttl: Duration) -> Result<(String, DateTime<Utc>)> {
        let expires_at = Utc::now() + ttl;
        let claims = Claims {
            sub: subject.to_string(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .context("signing token")?;

        Ok((token, expires_at))
    }

    /// Verify a token and return its subject.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                debug!("Token validation failed: {:?}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::InvalidSignature,
                }
            })?;

        Ok(token_data.claims.sub)
    }
}
