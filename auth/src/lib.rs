//! Authentication for Google Drive: the OAuth dance, typed sessions and the
//! cookies that carry them.

pub mod cookie;
mod session;

pub use session::{
    OAuthState, Session, SessionCodec, TokenPair, UserProfile, OAUTH_STATE_TTL_SECS,
    SESSION_TTL_SECS,
};

use chrono::Utc;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenUrl,
};
use reqwest::header::AUTHORIZATION;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";
pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";

pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Basic profile plus read access to the user's Drive.
pub const SCOPES: [&str; 4] = [
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/drive.readonly",
];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing configuration: {0} is not set")]
    MissingConfig(&'static str),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("OAuth Error: {0}")]
    OAuth(String),
    #[error("OAuth request timed out")]
    Timeout,
    #[error("Invalid session")]
    InvalidSession,
    #[error("Session has no access token")]
    MissingAccessToken,
    #[error("OAuth state mismatch")]
    StateMismatch,
    #[error("Profile Error: {0}")]
    Profile(String),
}

impl AuthError {
    /// Server-side misconfiguration, as opposed to a problem with the caller.
    pub fn is_config(&self) -> bool {
        matches!(self, AuthError::MissingConfig(_) | AuthError::InvalidConfig(_))
    }
}

/// Everything needed to talk to the OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_url: String,
}

fn require_env(name: &'static str) -> Result<String, AuthError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AuthError::MissingConfig(name)),
    }
}

impl OAuthSettings {
    /// Read the client credentials from the environment. Endpoint URLs may be
    /// overridden with `GOOGLE_AUTH_URL`, `GOOGLE_TOKEN_URL` and
    /// `GOOGLE_USERINFO_URL`.
    pub fn from_env(redirect_url: impl Into<String>) -> Result<Self, AuthError> {
        let client_id = require_env(CLIENT_ID_ENV)?;
        let client_secret = require_env(CLIENT_SECRET_ENV)?;
        Ok(OAuthSettings {
            client_id,
            client_secret,
            auth_url: std::env::var("GOOGLE_AUTH_URL")
                .unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string()),
            token_url: std::env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
            userinfo_url: std::env::var("GOOGLE_USERINFO_URL")
                .unwrap_or_else(|_| DEFAULT_USERINFO_URL.to_string()),
            redirect_url: redirect_url.into(),
        })
    }
}

/// The secret used to sign session cookies. When `SESSION_SECRET` is unset a
/// random one is generated and the second value is `true`.
pub fn session_secret_from_env() -> (String, bool) {
    match std::env::var(SESSION_SECRET_ENV) {
        Ok(secret) if !secret.is_empty() => (secret, false),
        _ => {
            let secret = format!(
                "{}{}",
                CsrfToken::new_random().secret(),
                CsrfToken::new_random().secret()
            );
            (secret, true)
        }
    }
}

/// Where to send the browser, plus what must survive the round trip.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub csrf_state: String,
    pub pkce_verifier: String,
}

#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    client: BasicClient,
    http: reqwest::Client,
    userinfo_url: String,
    timeout: Duration,
}

impl GoogleOAuth {
    pub fn new(settings: &OAuthSettings) -> Result<Self, AuthError> {
        let invalid = |e: url::ParseError| AuthError::InvalidConfig(e.to_string());
        let client = BasicClient::new(
            ClientId::new(settings.client_id.clone()),
            Some(ClientSecret::new(settings.client_secret.clone())),
            AuthUrl::new(settings.auth_url.clone()).map_err(invalid)?,
            Some(TokenUrl::new(settings.token_url.clone()).map_err(invalid)?),
        )
        .set_redirect_uri(RedirectUrl::new(settings.redirect_url.clone()).map_err(invalid)?);

        Ok(GoogleOAuth {
            client,
            http: build_http_client(DEFAULT_TIMEOUT),
            userinfo_url: settings.userinfo_url.clone(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = build_http_client(timeout);
        self.timeout = timeout;
        self
    }

    /// Build the consent URL. Account selection and consent are always
    /// forced so a refresh token is issued on every sign-in.
    pub fn authorize(&self) -> AuthorizationRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent select_account")
            .set_pkce_challenge(pkce_challenge)
            .url();

        AuthorizationRequest {
            url: url.to_string(),
            csrf_state: csrf_state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip_all))]
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: String,
    ) -> Result<TokenPair, AuthError> {
        let request = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(async_http_client);
        let response = self.bounded(request).await?;
        tracing::info!("Exchanged authorization code for tokens");
        Ok(TokenPair::from_response(&response, Utc::now()))
    }

    /// Trade a refresh token for a new access token. The old refresh token is
    /// kept when the provider does not rotate it.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip_all))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let token = RefreshToken::new(refresh_token.to_string());
        let request = self
            .client
            .exchange_refresh_token(&token)
            .request_async(async_http_client);
        let response = self.bounded(request).await?;

        let mut tokens = TokenPair::from_response(&response, Utc::now());
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        tracing::debug!("Refreshed access token");
        Ok(tokens)
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| AuthError::Profile(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::Profile(format!(
                "userinfo returned {}",
                response.status()
            )));
        }
        response
            .json::<UserProfile>()
            .await
            .map_err(|e| AuthError::Profile(e.to_string()))
    }

    async fn bounded<F, E>(&self, request: F) -> Result<BasicTokenResponse, AuthError>
    where
        F: Future<Output = Result<BasicTokenResponse, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result.map_err(|e| AuthError::OAuth(e.to_string())),
            Err(_) => Err(AuthError::Timeout),
        }
    }
}

fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}
