use crate::{ApiError, SharedState};
use auth::cookie::{read_cookie, session_cookie, SESSION_COOKIE};
use auth::{AuthError, Session};
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;

/// Find a cookie across every `Cookie` header of a request.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|header| read_cookie(header, name).map(str::to_string))
}

/// A verified session with a usable access token. Expired access tokens are
/// refreshed on the way in; `refreshed_cookie` then carries the new cookie.
#[derive(Debug)]
pub struct AuthSession {
    pub session: Session,
    pub refreshed_cookie: Option<String>,
}

#[axum::async_trait]
impl FromRequestParts<SharedState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let oauth = state.oauth()?;

        let token = cookie_value(&parts.headers, SESSION_COOKIE)
            .ok_or(ApiError::Unauthenticated("No session"))?;
        let mut session = match state.codec.decode(&token) {
            Ok(session) => session,
            Err(AuthError::MissingAccessToken) => {
                return Err(ApiError::Unauthenticated("No access token"))
            }
            Err(_) => return Err(ApiError::Unauthenticated("No session")),
        };

        if !session.access_token_expired(Utc::now()) {
            return Ok(AuthSession {
                session,
                refreshed_cookie: None,
            });
        }

        let refresh_token = session
            .refresh_token
            .clone()
            .ok_or(ApiError::Unauthenticated("Access token expired"))?;
        let tokens = oauth.refresh(&refresh_token).await.map_err(|e| {
            tracing::warn!(error = %e, "Access token refresh failed");
            ApiError::Unauthenticated("Session refresh failed")
        })?;
        session.apply_refresh(tokens);

        let value = state
            .codec
            .encode(&session)
            .map_err(|e| ApiError::Misconfigured(e.to_string()))?;
        Ok(AuthSession {
            session,
            refreshed_cookie: Some(session_cookie(&value, state.settings.secure_cookies)),
        })
    }
}
