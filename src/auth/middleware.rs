//! Bearer authentication middleware.

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::error::AuthError;
use super::issuer::TokenIssuer;
use crate::user::{User, UserRepository};

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::Unauthorized)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Unauthorized);
    }

    let token = parts.next().ok_or(AuthError::Unauthorized)?;
    if token.is_empty() || parts.next().is_some() {
        return Err(AuthError::Unauthorized);
    }

    Ok(token)
}

/// Validates bearer tokens and resolves the acting user.
///
/// Every failure surfaces as the same uniform `Unauthorized`; only the debug
/// logs distinguish a missing subject, a bad signature, an expired token, or
/// a disabled account.
#[derive(Clone)]
pub struct AccessGuard {
    users: UserRepository,
    issuer: TokenIssuer,
}

impl AccessGuard {
    /// Create a new guard.
    pub fn new(users: UserRepository, issuer: TokenIssuer) -> Self {
        Self { users, issuer }
    }

    /// Authenticate a bearer token and return the acting user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let subject = self.issuer.verify(token).map_err(|e| {
            debug!("Bearer token rejected: {}", e);
            AuthError::Unauthorized
        })?;

        let user = self.users.find_by_id(&subject).await?;
        match user {
            Some(user) if user.is_usable() => Ok(user),
            Some(user) => {
                debug!(user_id = %user.id, "Bearer token for disabled account");
                Err(AuthError::Unauthorized)
            }
            None => {
                debug!(subject = %subject, "Bearer token subject not found");
                Err(AuthError::Unauthorized)
            }
        }
    }
}

/// Authenticated user extracted from request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::Unauthorized)
    }
}

/// Authentication middleware.
///
/// Validates the Bearer token and injects `CurrentUser` into request
/// extensions for downstream handlers.
pub async fn auth_middleware(
    State(guard): State<AccessGuard>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::Unauthorized)?;

    let token = bearer_token_from_header(header)?;
    let user = guard.authenticate(token).await?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenIssuer;
    use crate::db::Database;
    use crate::user::NewUser;
    use chrono::Duration;

    const SECRET: &str = "test-secret-for-unit-tests-minimum-32-chars-long";

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(
            bearer_token_from_header("Bearer abc.def.ghi").unwrap(),
            "abc.def.ghi"
        );
        assert_eq!(
            bearer_token_from_header("bearer   token123").unwrap(),
            "token123"
        );

        for bad in ["", "Bearer", "Bearer ", "Basic abc", "Bearer token extra"] {
            assert!(bearer_token_from_header(bad).is_err(), "{bad} should fail");
        }
    }

    async fn guard_with_user(active: bool) -> (AccessGuard, String, TokenIssuer) {
        let db = Database::in_memory().await.unwrap();
        let users = UserRepository::new(db.pool().clone());
        let user = users
            .create(NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                first_name: None,
                last_name: None,
                contact_no: None,
                password_hash: "hashed".to_string(),
            })
            .await
            .unwrap();

        if !active {
            sqlx::query("UPDATE users SET is_deleted = TRUE WHERE id = ?")
                .bind(&user.id)
                .execute(db.pool())
                .await
                .unwrap();
        }

        let issuer = TokenIssuer::new(SECRET, Duration::minutes(15), Duration::days(7));
        (AccessGuard::new(users, issuer.clone()), user.id, issuer)
    }

    #[tokio::test]
    async fn authenticate_resolves_user() {
        let (guard, user_id, issuer) = guard_with_user(true).await;
        let token = issuer.issue_access_token(&user_id).unwrap();

        let user = guard.authenticate(&token).await.unwrap();
        assert_eq!(user.id, user_id);
    }

    #[tokio::test]
    async fn authenticate_rejects_unknown_subject() {
        let (guard, _, issuer) = guard_with_user(true).await;
        let token = issuer.issue_access_token("no-such-user").unwrap();

        let err = guard.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn authenticate_rejects_soft_deleted_user() {
        let (guard, user_id, issuer) = guard_with_user(false).await;
        let token = issuer.issue_access_token(&user_id).unwrap();

        let err = guard.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn authenticate_rejects_garbage_uniformly() {
        let (guard, _, _) = guard_with_user(true).await;
        let err = guard.authenticate("garbage").await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }
}
