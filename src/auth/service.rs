//! Session management: login, refresh rotation, logout, registration, and
//! reconciliation of federated identities with the local user store.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::error::AuthError;
use super::issuer::TokenIssuer;
use super::password;
use crate::oidc::IdentityAssertion;
use crate::token::RefreshTokenRepository;
use crate::user::{NewUser, UserRepository, UserView, is_unique_violation};

const MAX_USERNAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 8;

/// Fields accepted at registration.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub contact_no: Option<String>,
}

/// An issued access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenPair {
    fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Orchestrates the credential store and token issuer.
///
/// Each refresh-token chain moves through three states: active, rotated
/// (the same row overwritten with a new token and expiry), and revoked
/// (terminal, row retained).
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    tokens: RefreshTokenRepository,
    issuer: TokenIssuer,
}

impl AuthService {
    /// Create a new service.
    pub fn new(
        users: UserRepository,
        tokens: RefreshTokenRepository,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            users,
            tokens,
            issuer,
        }
    }

    /// Register a new user with a password.
    ///
    /// New accounts are active immediately; there is no verification gate.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<UserView, AuthError> {
        validate_registration(&registration)?;

        if self
            .users
            .find_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict("Email already registered".to_string()));
        }
        if self
            .users
            .find_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict(
                "Username already registered".to_string(),
            ));
        }

        let password_hash = password::hash(&registration.password)?;
        let new_user = NewUser {
            username: registration.username,
            email: registration.email,
            first_name: registration.first_name,
            last_name: registration.last_name,
            contact_no: registration.contact_no,
            password_hash,
        };

        // The store enforces uniqueness too; interleaved registrations that
        // pass the pre-checks still resolve to exactly one winner.
        let user = match self.users.create(new_user).await {
            Ok(user) => user,
            Err(err) if is_unique_violation(&err) => {
                return Err(AuthError::Conflict(
                    "Email or username already registered".to_string(),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        info!(user_id = %user.id, "Registered user");
        Ok(user.to_view())
    }

    /// Authenticate with username and password, issuing a token pair.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_usable() {
            return Err(AuthError::AccountDisabled);
        }

        let pair = self.issue_pair(&user.id).await?;
        info!(user_id = %user.id, "User logged in");
        Ok(pair)
    }

    /// Exchange a refresh token for a new access/refresh pair, rotating the
    /// stored row in place.
    ///
    /// Revocation is the only gate on the presented token: an expired but
    /// unrevoked token is still honored.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let record = self
            .tokens
            .find(refresh_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if record.revoked {
            return Err(AuthError::InvalidToken);
        }

        let user = self.users.find_by_id(&record.user_id).await?;
        let user = match user {
            Some(user) if user.is_usable() => user,
            _ => return Err(AuthError::InvalidUser),
        };

        let access_token = self.issuer.issue_access_token(&user.id)?;
        let (new_refresh_token, expires_at) = self.issuer.issue_refresh_token(&user.id)?;
        self.tokens
            .rotate(refresh_token, &new_refresh_token, expires_at)
            .await?;

        info!(user_id = %user.id, "Rotated refresh token");
        Ok(TokenPair::bearer(access_token, new_refresh_token))
    }

    /// Revoke a refresh token, ending its chain.
    ///
    /// Other chains belonging to the same user are untouched.
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let record = self
            .tokens
            .find(refresh_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.tokens.revoke(&record.token).await?;
        info!(user_id = %record.user_id, "User logged out");
        Ok(())
    }

    /// Log in from a verified federated identity assertion, provisioning a
    /// local user on first sight.
    ///
    /// The assertion is trusted as-is; verifying it against the provider is
    /// the callback handshake's job. Auto-provisioned accounts get the local
    /// part of the email as username and a password digest that can never
    /// verify, so the password path stays closed for them.
    #[instrument(skip(self, assertion), fields(email = %assertion.email))]
    pub async fn federated_login(
        &self,
        assertion: IdentityAssertion,
    ) -> Result<TokenPair, AuthError> {
        let user = match self.users.find_by_email(&assertion.email).await? {
            Some(user) => user,
            None => {
                let username = local_part(&assertion.email).to_string();
                let new_user = NewUser {
                    username,
                    email: assertion.email.clone(),
                    first_name: assertion.given_name.clone(),
                    last_name: assertion.family_name.clone(),
                    contact_no: None,
                    password_hash: password::FEDERATED_SENTINEL.to_string(),
                };

                match self.users.create(new_user).await {
                    Ok(user) => {
                        info!(user_id = %user.id, "Provisioned federated user");
                        user
                    }
                    Err(err) if is_unique_violation(&err) => {
                        return Err(AuthError::Conflict(
                            "Username already registered".to_string(),
                        ));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        if !user.is_usable() {
            return Err(AuthError::AccountDisabled);
        }

        let pair = self.issue_pair(&user.id).await?;
        info!(user_id = %user.id, "Federated login succeeded");
        Ok(pair)
    }

    /// Issue an access/refresh pair and persist the refresh token as a new
    /// row.
    async fn issue_pair(&self, user_id: &str) -> Result<TokenPair, AuthError> {
        let access_token = self.issuer.issue_access_token(user_id)?;
        let (refresh_token, expires_at) = self.issuer.issue_refresh_token(user_id)?;
        self.tokens
            .store(user_id, &refresh_token, expires_at)
            .await?;

        Ok(TokenPair::bearer(access_token, refresh_token))
    }
}

fn validate_registration(registration: &Registration) -> Result<(), AuthError> {
    if registration.username.is_empty() || registration.username.len() > MAX_USERNAME_LEN {
        return Err(AuthError::InvalidInput(format!(
            "Username must be between 1 and {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !is_plausible_email(&registration.email) {
        return Err(AuthError::InvalidInput("Invalid email address".to_string()));
    }
    if registration.password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    parts.len() == 2 && !parts[0].is_empty() && parts[1].contains('.')
}

fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
