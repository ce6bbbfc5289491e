//! User repository for database operations.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::models::{NewUser, User};

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// Assigns a fresh ID and timestamps; the caller observes the fully
    /// populated record on return. Email and username uniqueness is enforced
    /// here by the UNIQUE constraints even when the caller pre-checked, so
    /// interleaved registrations cannot both succeed.
    #[instrument(skip(self, new_user), fields(username = %new_user.username))]
    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        debug!("Creating user: {} ({})", new_user.username, id);

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, first_name, last_name, contact_no,
                password_hash, is_verified, is_active, is_deleted, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, FALSE, TRUE, FALSE, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.contact_no)
        .bind(&new_user.password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("inserting user")?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after creation"))
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, first_name, last_name, contact_no,
                   password_hash, is_verified, is_active, is_deleted, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching user by id")?;

        Ok(user)
    }

    /// Get a user by username. Exact match, case-sensitive.
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, first_name, last_name, contact_no,
                   password_hash, is_verified, is_active, is_deleted, created_at, updated_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("fetching user by username")?;

        Ok(user)
    }

    /// Get a user by email. Exact match, case-sensitive.
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, first_name, last_name, contact_no,
                   password_hash, is_verified, is_active, is_deleted, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("fetching user by email")?;

        Ok(user)
    }
}

/// Check whether an error chain contains a unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db_err| db_err.is_unique_violation())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            first_name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
            contact_no: None,
            password_hash: "hashed".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_fetch() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        let user = repo
            .create(new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        assert!(!user.id.is_empty());
        assert!(user.is_active);
        assert!(!user.is_deleted);
        assert!(!user.is_verified);

        let by_id = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        let by_username = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_username.id, user.id);

        let by_email = repo
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn lookups_are_case_sensitive() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        repo.create(new_user("Bob", "Bob@example.com"))
            .await
            .unwrap();

        assert!(repo.find_by_username("bob").await.unwrap().is_none());
        assert!(repo.find_by_email("bob@example.com").await.unwrap().is_none());
        assert!(repo.find_by_username("Bob").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_email_is_unique_violation() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        repo.create(new_user("carol", "carol@example.com"))
            .await
            .unwrap();

        let err = repo
            .create(new_user("carol2", "carol@example.com"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        // The first record is unaffected.
        let original = repo.find_by_username("carol").await.unwrap().unwrap();
        assert_eq!(original.email, "carol@example.com");
    }

    #[tokio::test]
    async fn duplicate_username_is_unique_violation() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        repo.create(new_user("dave", "dave@example.com"))
            .await
            .unwrap();

        let err = repo
            .create(new_user("dave", "dave2@example.com"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
