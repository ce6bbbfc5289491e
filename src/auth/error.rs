//! Authentication errors and their HTTP mapping.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Authentication domain errors.
///
/// The HTTP mapping is part of the wire contract: duplicate registrations and
/// bad credentials answer 400 (not 409/401), disabled accounts 403, and
/// unknown or revoked refresh tokens 401.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or username already taken.
    #[error("{0}")]
    Conflict(String),

    /// Malformed registration input.
    #[error("{0}")]
    InvalidInput(String),

    /// Unknown user or wrong password. The message does not reveal which.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Account is deactivated or soft-deleted.
    #[error("Account inactive or deleted")]
    AccountDisabled,

    /// Refresh token unknown or revoked.
    #[error("Invalid or revoked refresh token")]
    InvalidToken,

    /// Refresh token's owning user is missing or disabled.
    #[error("Invalid user")]
    InvalidUser,

    /// Bearer authentication failed. Deliberately uniform: the message does
    /// not distinguish missing, malformed, expired, or mismatched tokens.
    #[error("Could not validate credentials")]
    Unauthorized,

    /// Federated login handshake failed.
    #[error("{0}")]
    Federation(String),

    /// Persistence-layer fault. Propagates; never retried.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Conflict(_)
            | AuthError::InvalidInput(_)
            | AuthError::InvalidCredentials
            | AuthError::Federation(_) => StatusCode::BAD_REQUEST,
            AuthError::AccountDisabled | AuthError::InvalidUser => StatusCode::FORBIDDEN,
            AuthError::InvalidToken | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AuthError::Conflict(_) => "conflict",
            AuthError::InvalidInput(_) => "invalid_input",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccountDisabled => "account_disabled",
            AuthError::InvalidToken => "invalid_token",
            AuthError::InvalidUser => "invalid_user",
            AuthError::Unauthorized => "unauthorized",
            AuthError::Federation(_) => "federation_error",
            AuthError::Store(_) => "internal_error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        let message = match &self {
            AuthError::Store(err) => {
                error!(error = ?err, "Store failure");
                "internal server error".to_string()
            }
            _ => {
                tracing::debug!(error_code, message = %self, "Auth failure");
                self.to_string()
            }
        };

        let body = Json(AuthErrorResponse {
            error: message,
            error_code: error_code.to_string(),
        });

        if matches!(self, AuthError::Unauthorized) {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_wire_contract() {
        assert_eq!(
            AuthError::Conflict("Email already registered".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::AccountDisabled.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::InvalidToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::InvalidUser.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Federation("denied".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn credential_failures_do_not_leak_detail() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Incorrect username or password"
        );
        assert_eq!(
            AuthError::Unauthorized.to_string(),
            "Could not validate credentials"
        );
    }
}
