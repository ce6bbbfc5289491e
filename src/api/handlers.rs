//! HTTP handlers.

use axum::{
    Form, Json,
    extract::{Query, State},
    http::{StatusCode, header::LOCATION},
    response::{AppendHeaders, IntoResponse},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::state::AppState;
use crate::auth::{AuthError, CurrentUser, Registration, TokenPair};
use crate::user::UserView;

/// Generic message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Service banner.
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "authd authentication service".to_string(),
    })
}

/// Health check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Register a new user.
#[instrument(skip(state, registration), fields(username = %registration.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<Json<UserView>, AuthError> {
    let view = state.auth.register(registration).await?;
    Ok(Json(view))
}

/// Password-grant login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Log in with username and password, returning a token pair.
#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenPair>, AuthError> {
    let pair = state.auth.login(&form.username, &form.password).await?;
    Ok(Json(pair))
}

/// Refresh token request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Exchange a refresh token for a new pair.
#[instrument(skip(state, request))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let pair = state.auth.refresh(&request.refresh_token).await?;
    Ok(Json(pair))
}

/// Revoke a refresh token.
#[instrument(skip(state, request))]
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    state.auth.logout(&request.refresh_token).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// Start the Google login flow with a 302 redirect to the provider.
#[instrument(skip(state))]
pub async fn google_login(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AuthError> {
    let oidc = state
        .oidc
        .as_ref()
        .ok_or_else(|| AuthError::Federation("Federated login is not configured".to_string()))?;

    let url = oidc
        .authorize_url()
        .map_err(|e| AuthError::Federation(e.to_string()))?;

    info!("Redirecting to federated login");
    Ok((StatusCode::FOUND, AppendHeaders([(LOCATION, url)])))
}

/// Provider callback query parameters.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Complete the Google login flow: verify the state, exchange the code, and
/// reconcile the identity with the local store.
///
/// Any failure on this path answers 400.
#[instrument(skip(state, params))]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<TokenPair>, AuthError> {
    let pair = handle_google_callback(&state, params).await.map_err(|e| {
        warn!("Federated callback failed: {}", e);
        AuthError::Federation(e.to_string())
    })?;

    Ok(Json(pair))
}

async fn handle_google_callback(
    state: &AppState,
    params: CallbackParams,
) -> Result<TokenPair, AuthError> {
    let oidc = state
        .oidc
        .as_ref()
        .ok_or_else(|| AuthError::Federation("Federated login is not configured".to_string()))?;

    if let Some(error) = params.error {
        return Err(AuthError::Federation(format!(
            "Provider returned an error: {}",
            error
        )));
    }

    let oauth_state = params
        .state
        .ok_or_else(|| AuthError::Federation("Missing state parameter".to_string()))?;
    oidc.verify_state(&oauth_state)
        .map_err(|e| AuthError::Federation(e.to_string()))?;

    let code = params
        .code
        .ok_or_else(|| AuthError::Federation("Missing authorization code".to_string()))?;
    let assertion = oidc
        .exchange_code(&code)
        .await
        .map_err(|e| AuthError::Federation(e.to_string()))?;

    state.auth.federated_login(assertion).await
}

/// Return the acting user resolved from the bearer token.
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserView> {
    Json(user.to_view())
}
