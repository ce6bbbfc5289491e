//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::{AccessGuard, AuthService};
use crate::oidc::GoogleOidcClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session manager for registration, login, refresh, and logout.
    pub auth: Arc<AuthService>,
    /// Bearer-token access guard for protected routes.
    pub guard: AccessGuard,
    /// Google OIDC client. Absent when federation is not configured.
    pub oidc: Option<Arc<GoogleOidcClient>>,
    /// Allowed CORS origins.
    pub allowed_origins: Vec<String>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        auth: AuthService,
        guard: AccessGuard,
        oidc: Option<GoogleOidcClient>,
        allowed_origins: Vec<String>,
    ) -> Self {
        Self {
            auth: Arc::new(auth),
            guard,
            oidc: oidc.map(Arc::new),
            allowed_origins,
        }
    }
}
