//! Refresh token repository.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::models::RefreshTokenRecord;

/// Repository for refresh token persistence.
#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    pool: SqlitePool,
}

impl RefreshTokenRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a refresh token by its token string. Exact match.
    #[instrument(skip(self, token))]
    pub async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token, expires_at, created_at, revoked
            FROM refresh_tokens
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("fetching refresh token")?;

        Ok(record)
    }

    /// Store a newly issued refresh token as a new row.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn store(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at, revoked)
            VALUES (?, ?, ?, ?, ?, FALSE)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(token)
        .bind(expires_at.to_rfc3339())
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("storing refresh token")?;

        debug!(user_id = %user_id, "Stored refresh token");
        Ok(())
    }

    /// Rotate a token in place: the existing row's token string and expiry
    /// are overwritten, leaving a single row per chain. The write is one
    /// statement, so concurrent rotations of the same row resolve to
    /// last-writer-wins. No-op if the old token string is unknown.
    #[instrument(skip(self, old_token, new_token))]
    pub async fn rotate(
        &self,
        old_token: &str,
        new_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET token = ?, expires_at = ?, created_at = ?, revoked = FALSE
            WHERE token = ?
            "#,
        )
        .bind(new_token)
        .bind(new_expires_at.to_rfc3339())
        .bind(&now)
        .bind(old_token)
        .execute(&self.pool)
        .await
        .context("rotating refresh token")?;

        Ok(())
    }

    /// Mark a token as revoked. The row is retained. No-op if unknown.
    #[instrument(skip(self, token))]
    pub async fn revoke(&self, token: &str) -> Result<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .context("revoking refresh token")?;

        Ok(())
    }
}
