use crate::session::cookie_value;
use crate::{ApiError, SharedState};
use auth::cookie::{clear_cookie, session_cookie, state_cookie, SESSION_COOKIE, STATE_COOKIE};
use auth::{OAuthState, Session, UserProfile};
use axum::extract::{Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

const DEFAULT_CALLBACK: &str = "/dashboard";

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn redirect(location: &str, cookies: &[String]) -> Result<Response, ApiError> {
    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    headers.insert(LOCATION, header_value(location)?);
    for cookie in cookies {
        headers.append(SET_COOKIE, header_value(cookie)?);
    }
    Ok(response)
}

const CALLBACK_BASE: &str = "http://drivepicz.invalid";

/// A relative path that stays on this host once a browser resolves it.
/// Browsers read `\` as `/`, so backslashes are refused outright.
fn is_same_site(path: &str) -> bool {
    if !path.starts_with('/')
        || path.starts_with("//")
        || path.contains('\\')
        || path.chars().any(char::is_control)
    {
        return false;
    }
    let base = match url::Url::parse(CALLBACK_BASE) {
        Ok(base) => base,
        Err(_) => return false,
    };
    base.join(path)
        .is_ok_and(|resolved| resolved.origin() == base.origin())
}

/// Only same-site relative paths are followed after sign-in.
fn safe_callback(callback: Option<&str>) -> &str {
    match callback {
        Some(path) if is_same_site(path) => path,
        _ => DEFAULT_CALLBACK,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInQuery {
    callback_url: Option<String>,
}

pub(crate) async fn signin(
    State(state): State<SharedState>,
    Query(query): Query<SignInQuery>,
) -> Result<Response, ApiError> {
    let oauth = state.oauth()?;
    let request = oauth.authorize();
    let callback = safe_callback(query.callback_url.as_deref());

    let oauth_state = OAuthState::new(&request, callback, Utc::now());
    let value = state
        .codec
        .encode_state(&oauth_state)
        .map_err(|e| ApiError::Misconfigured(e.to_string()))?;

    tracing::info!("Redirecting to provider sign-in");
    redirect(
        &request.url,
        &[state_cookie(&value, state.settings.secure_cookies)],
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub(crate) async fn callback(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let oauth = state.oauth()?;
    if let Some(error) = query.error {
        tracing::warn!(%error, "Provider denied sign-in");
        return Err(ApiError::BadRequest(format!("Sign-in failed: {}", error)));
    }
    let code = query
        .code
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".into()))?;

    let oauth_state = cookie_value(&headers, STATE_COOKIE)
        .and_then(|raw| state.codec.decode_state(&raw).ok())
        .ok_or_else(|| ApiError::BadRequest("Missing or expired sign-in state".into()))?;
    oauth_state
        .verify(query.state.as_deref().unwrap_or_default())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let tokens = oauth
        .exchange_code(code, oauth_state.verifier.clone())
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Authorization code exchange failed");
            ApiError::Unauthenticated("Sign-in failed")
        })?;

    let user = match oauth.fetch_profile(&tokens.access_token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Could not load user profile");
            UserProfile::default()
        }
    };

    let session = Session::new(tokens, user, Utc::now());
    let value = state
        .codec
        .encode(&session)
        .map_err(|e| ApiError::Misconfigured(e.to_string()))?;

    tracing::info!(email = ?session.user.email, "Signed in");
    let secure = state.settings.secure_cookies;
    redirect(
        safe_callback(Some(&oauth_state.callback_url)),
        &[
            session_cookie(&value, secure),
            clear_cookie(STATE_COOKIE, secure),
        ],
    )
}

pub(crate) async fn signout(State(state): State<SharedState>) -> Result<Response, ApiError> {
    redirect("/", &[clear_cookie(SESSION_COOKIE, state.settings.secure_cookies)])
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    user: UserProfile,
    expires: String,
}

/// The signed-in user, or `{}` when there is no valid session.
pub(crate) async fn session(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let session = cookie_value(&headers, SESSION_COOKIE)
        .and_then(|raw| state.codec.decode(&raw).ok());
    match session {
        Some(session) => Json(SessionResponse {
            expires: session
                .expires()
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            user: session.user,
        })
        .into_response(),
        None => Json(serde_json::json!({})).into_response(),
    }
}
