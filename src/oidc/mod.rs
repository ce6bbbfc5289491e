//! Google OpenID-Connect client for federated login.
//!
//! This is the handshake half of federation: it builds the authorization
//! redirect, guards the round trip with a signed `state` parameter, and
//! exchanges the callback code for the provider's userinfo. What comes out is
//! a verified [`IdentityAssertion`] that the session layer consumes as-is;
//! reconciling it with the local user store is not this module's job.

use anyhow::{Context, Result, bail};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::config::OidcConfig;

type HmacSha256 = Hmac<Sha256>;

const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";

/// A verified identity assertion from the provider.
///
/// Produced only after the provider has authenticated the user and exchanged
/// the authorization code; downstream code trusts it without further checks.
#[derive(Debug, Clone)]
pub struct IdentityAssertion {
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

/// Client for Google's OIDC endpoints.
pub struct GoogleOidcClient {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    state_secret: Vec<u8>,
    token_endpoint: String,
    userinfo_endpoint: String,
}

impl GoogleOidcClient {
    /// Create a client from configuration. Fails if federation is not fully
    /// configured.
    pub fn from_config(config: &OidcConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("building OIDC HTTP client")?;

        Ok(Self {
            http_client,
            client_id: config
                .client_id
                .clone()
                .context("oidc.client_id is not configured")?,
            client_secret: config
                .client_secret
                .clone()
                .context("oidc.client_secret is not configured")?,
            redirect_uri: config
                .redirect_uri
                .clone()
                .context("oidc.redirect_uri is not configured")?,
            state_secret: config
                .state_secret
                .clone()
                .context("oidc.state_secret is not configured")?
                .into_bytes(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            userinfo_endpoint: USERINFO_ENDPOINT.to_string(),
        })
    }

    /// Point the client at alternative token/userinfo endpoints. Intended for
    /// tests against a local stub provider.
    pub fn with_endpoints(mut self, token_endpoint: &str, userinfo_endpoint: &str) -> Self {
        self.token_endpoint = token_endpoint.to_string();
        self.userinfo_endpoint = userinfo_endpoint.to_string();
        self
    }

    /// Build the provider authorization URL for the login redirect.
    pub fn authorize_url(&self) -> Result<String> {
        let state = self.sign_state()?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            AUTHORIZATION_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SCOPES),
            state,
        ))
    }

    /// Check the `state` parameter echoed back by the provider.
    pub fn verify_state(&self, state: &str) -> Result<()> {
        let bytes = URL_SAFE_NO_PAD
            .decode(state)
            .context("state parameter is not valid base64")?;
        let decoded = String::from_utf8(bytes).context("state parameter is not UTF-8")?;

        let (payload, signature_hex) = decoded
            .rsplit_once('|')
            .context("state parameter is malformed")?;

        let mut mac =
            HmacSha256::new_from_slice(&self.state_secret).context("initializing state HMAC")?;
        mac.update(payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if signature_hex != expected {
            bail!("state parameter signature mismatch");
        }

        Ok(())
    }

    /// Exchange an authorization code for the user's identity.
    pub async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion> {
        debug!("Exchanging authorization code");

        let response = self
            .http_client
            .post(&self.token_endpoint)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("token endpoint request failed")?;

        if !response.status().is_success() {
            bail!("token endpoint returned status {}", response.status());
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("invalid token endpoint response")?;

        let response = self
            .http_client
            .get(&self.userinfo_endpoint)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("userinfo request failed")?;

        if !response.status().is_success() {
            bail!("userinfo endpoint returned status {}", response.status());
        }

        let userinfo: UserInfoResponse = response
            .json()
            .await
            .context("invalid userinfo response")?;

        let email = userinfo.email.context("userinfo is missing the email claim")?;

        Ok(IdentityAssertion {
            email,
            given_name: userinfo.given_name,
            family_name: userinfo.family_name,
        })
    }

    /// Sign a timestamped `state` value.
    fn sign_state(&self) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system time before the epoch")?
            .as_millis();
        let payload = format!("{:x}", timestamp);

        let mut mac =
            HmacSha256::new_from_slice(&self.state_secret).context("initializing state HMAC")?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        let signed = format!("{}|{}", payload, signature);
        Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    email: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleOidcClient {
        let config = OidcConfig {
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
            redirect_uri: Some("http://localhost:8080/auth/google/callback".to_string()),
            state_secret: Some("state-signing-secret".to_string()),
        };
        GoogleOidcClient::from_config(&config).unwrap()
    }

    #[test]
    fn from_config_requires_all_fields() {
        let config = OidcConfig {
            client_id: Some("client-id".to_string()),
            ..Default::default()
        };
        assert!(GoogleOidcClient::from_config(&config).is_err());
    }

    #[test]
    fn authorize_url_carries_the_flow_parameters() {
        let url = client().authorize_url().unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state="));
        assert!(url.contains(&format!(
            "redirect_uri={}",
            urlencoding::encode("http://localhost:8080/auth/google/callback")
        )));
    }

    #[test]
    fn state_round_trip() {
        let client = client();
        let url = client.authorize_url().unwrap();
        let state = url.rsplit("state=").next().unwrap();

        client.verify_state(state).unwrap();
    }

    #[test]
    fn tampered_state_is_rejected() {
        let client = client();
        let signed = client.sign_state().unwrap();

        // Corrupt the signature while keeping the encoding valid.
        let mut decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&signed).unwrap()).unwrap();
        let flipped = if decoded.ends_with('0') { '1' } else { '0' };
        decoded.pop();
        decoded.push(flipped);
        let tampered = URL_SAFE_NO_PAD.encode(decoded.as_bytes());

        assert!(client.verify_state(&tampered).is_err());
        assert!(client.verify_state("not-even-base64!!").is_err());
        assert!(client.verify_state("").is_err());
    }

    #[test]
    fn state_signed_with_other_secret_is_rejected() {
        let other = GoogleOidcClient::from_config(&OidcConfig {
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
            redirect_uri: Some("http://localhost:8080/auth/google/callback".to_string()),
            state_secret: Some("a-different-secret".to_string()),
        })
        .unwrap();

        let state = other.sign_state().unwrap();
        assert!(client().verify_state(&state).is_err());
    }

    async fn stub_provider(router: axum::Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn exchange_code_returns_the_provider_identity() {
        use axum::{
            Json, Router,
            routing::{get, post},
        };
        use serde_json::json;

        let stub = Router::new()
            .route(
                "/token",
                post(|| async { Json(json!({ "access_token": "provider-access-token" })) }),
            )
            .route(
                "/userinfo",
                get(|| async {
                    Json(json!({
                        "email": "ada@example.com",
                        "given_name": "Ada",
                        "family_name": "Lovelace"
                    }))
                }),
            );
        let addr = stub_provider(stub).await;

        let client = client().with_endpoints(
            &format!("http://{addr}/token"),
            &format!("http://{addr}/userinfo"),
        );

        let assertion = client.exchange_code("auth-code").await.unwrap();
        assert_eq!(assertion.email, "ada@example.com");
        assert_eq!(assertion.given_name.as_deref(), Some("Ada"));
        assert_eq!(assertion.family_name.as_deref(), Some("Lovelace"));
    }

    #[tokio::test]
    async fn exchange_code_surfaces_a_rejected_code() {
        use axum::{Router, http::StatusCode, routing::post};

        let stub =
            Router::new().route("/token", post(|| async { StatusCode::BAD_REQUEST }));
        let addr = stub_provider(stub).await;

        let client = client().with_endpoints(
            &format!("http://{addr}/token"),
            &format!("http://{addr}/userinfo"),
        );

        let err = client.exchange_code("rejected-code").await.unwrap_err();
        assert!(err.to_string().contains("token endpoint"));
    }

    #[tokio::test]
    async fn exchange_code_requires_the_email_claim() {
        use axum::{
            Json, Router,
            routing::{get, post},
        };
        use serde_json::json;

        let stub = Router::new()
            .route(
                "/token",
                post(|| async { Json(json!({ "access_token": "provider-access-token" })) }),
            )
            .route(
                "/userinfo",
                get(|| async { Json(json!({ "given_name": "Ada" })) }),
            );
        let addr = stub_provider(stub).await;

        let client = client().with_endpoints(
            &format!("http://{addr}/token"),
            &format!("http://{addr}/userinfo"),
        );

        let err = client.exchange_code("auth-code").await.unwrap_err();
        assert!(err.to_string().contains("email"));
    }
}
