//! HTTP surface of DrivePicz: sign-in, the media listing and the thumbnail
//! proxy.

mod error;
mod routes;
mod session;

pub use error::ApiError;
pub use session::AuthSession;

use api_client::ApiClient;
use auth::{AuthError, GoogleOAuth, SessionCodec};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailMode {
    /// Fetch the preview server-side and stream it back.
    #[default]
    Proxy,
    /// Answer with a redirect to the provider's preview URL.
    Redirect,
}

impl std::str::FromStr for ThumbnailMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "proxy" => Ok(ThumbnailMode::Proxy),
            "redirect" => Ok(ThumbnailMode::Redirect),
            other => Err(format!("unknown thumbnail mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebSettings {
    pub public_url: String,
    pub secure_cookies: bool,
    pub thumbnail_size: u32,
    pub thumbnail_mode: ThumbnailMode,
    pub request_timeout: Duration,
    pub drive_api_url: String,
}

impl Default for WebSettings {
    fn default() -> Self {
        WebSettings {
            public_url: "http://localhost:3000".to_string(),
            secure_cookies: false,
            thumbnail_size: 1600,
            thumbnail_mode: ThumbnailMode::Proxy,
            request_timeout: api_client::DEFAULT_TIMEOUT,
            drive_api_url: api_client::DRIVE_API_URL.to_string(),
        }
    }
}

impl WebSettings {
    pub fn redirect_url(&self) -> String {
        format!(
            "{}/api/auth/callback/google",
            self.public_url.trim_end_matches('/')
        )
    }
}

pub struct AppState {
    oauth: Result<GoogleOAuth, String>,
    pub codec: SessionCodec,
    pub settings: WebSettings,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// A configuration error is kept rather than returned so the server can
    /// still start and answer with a clear 500.
    pub fn new(
        oauth: Result<GoogleOAuth, AuthError>,
        codec: SessionCodec,
        settings: WebSettings,
    ) -> Self {
        let oauth = oauth.map_err(|e| {
            tracing::error!(target: "config", error = %e, "OAuth is not configured; provider routes will fail");
            e.to_string()
        });
        AppState {
            oauth,
            codec,
            settings,
        }
    }

    pub fn oauth(&self) -> Result<&GoogleOAuth, ApiError> {
        self.oauth
            .as_ref()
            .map_err(|e| ApiError::Misconfigured(e.clone()))
    }

    pub fn drive_client(&self, access_token: &str) -> ApiClient {
        ApiClient::with_base_url(access_token.to_string(), self.settings.drive_api_url.clone())
            .with_timeout(self.settings.request_timeout)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/signin", get(routes::auth::signin))
        .route("/api/auth/callback/google", get(routes::auth::callback))
        .route(
            "/api/auth/signout",
            get(routes::auth::signout).post(routes::auth::signout),
        )
        .route("/api/auth/session", get(routes::auth::session))
        .route("/api/drive/media", get(routes::drive::list_media))
        .route(
            "/api/drive/thumbnail/:file_id",
            get(routes::drive::thumbnail),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Append a `Set-Cookie` header when a cookie was (re)issued.
pub(crate) fn with_cookie(mut response: Response, cookie: Option<String>) -> Response {
    if let Some(cookie) = cookie {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Dropping unencodable cookie"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_url() {
        let settings = WebSettings {
            public_url: "https://photos.example.com/".into(),
            ..WebSettings::default()
        };
        assert_eq!(
            settings.redirect_url(),
            "https://photos.example.com/api/auth/callback/google"
        );
    }

    #[test]
    fn test_thumbnail_mode_parse() {
        assert_eq!("Redirect".parse::<ThumbnailMode>(), Ok(ThumbnailMode::Redirect));
        assert!("inline".parse::<ThumbnailMode>().is_err());
    }
}
