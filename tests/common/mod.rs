//! Test utilities and common setup.

use axum::Router;
use chrono::Duration;

use authd::api::{AppState, create_router};
use authd::auth::{AccessGuard, AuthService, TokenIssuer};
use authd::config::OidcConfig;
use authd::db::Database;
use authd::oidc::GoogleOidcClient;
use authd::token::RefreshTokenRepository;
use authd::user::UserRepository;

const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";

/// Create a test application with all services over an in-memory database.
pub async fn test_app() -> Router {
    let (app, _, _) = test_app_with_handles().await;
    app
}

/// Create a test application, returning the issuer and database handles for
/// tests that need to mint tokens or reach into the store.
pub async fn test_app_with_handles() -> (Router, TokenIssuer, Database) {
    let db = Database::in_memory().await.unwrap();
    let issuer = TokenIssuer::new(TEST_SECRET, Duration::minutes(15), Duration::days(7));

    let users = UserRepository::new(db.pool().clone());
    let tokens = RefreshTokenRepository::new(db.pool().clone());

    let auth = AuthService::new(users.clone(), tokens, issuer.clone());
    let guard = AccessGuard::new(users, issuer.clone());

    let state = AppState::new(auth, guard, None, Vec::new());
    (create_router(state), issuer, db)
}

/// Create a test application with federated login configured.
pub async fn test_app_with_oidc() -> Router {
    let db = Database::in_memory().await.unwrap();
    let issuer = TokenIssuer::new(TEST_SECRET, Duration::minutes(15), Duration::days(7));

    let users = UserRepository::new(db.pool().clone());
    let tokens = RefreshTokenRepository::new(db.pool().clone());

    let auth = AuthService::new(users.clone(), tokens, issuer.clone());
    let guard = AccessGuard::new(users, issuer);

    let oidc_config = OidcConfig {
        client_id: Some("test-client-id".to_string()),
        client_secret: Some("test-client-secret".to_string()),
        redirect_uri: Some("http://localhost:8080/auth/google/callback".to_string()),
        state_secret: Some("test-state-signing-secret".to_string()),
    };
    let oidc = GoogleOidcClient::from_config(&oidc_config).unwrap();

    let state = AppState::new(auth, guard, Some(oidc), Vec::new());
    create_router(state)
}
