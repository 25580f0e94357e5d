use crate::{AuthError, AuthorizationRequest};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use oauth2::basic::BasicTokenResponse;
use oauth2::TokenResponse;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Sessions live for a fixed 24 hours regardless of token refreshes.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;
pub const OAUTH_STATE_TTL_SECS: i64 = 10 * 60;

/// Access tokens are treated as stale this long before they actually expire.
const ACCESS_TOKEN_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds.
    pub expires_at: Option<i64>,
}

impl TokenPair {
    pub(crate) fn from_response(response: &BasicTokenResponse, now: DateTime<Utc>) -> Self {
        TokenPair {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_at: response
                .expires_in()
                .map(|d| now.timestamp() + d.as_secs() as i64),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// The signed contents of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_expires_at: Option<i64>,
    #[serde(default)]
    pub user: UserProfile,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl Session {
    pub fn new(tokens: TokenPair, user: UserProfile, now: DateTime<Utc>) -> Self {
        Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.expires_at,
            user,
            issued_at: now.timestamp(),
            expires_at: now.timestamp() + SESSION_TTL_SECS,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }

    pub fn access_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.access_expires_at
            .map(|at| now.timestamp() >= at - ACCESS_TOKEN_SKEW_SECS)
            .unwrap_or(false)
    }

    /// Swap in refreshed tokens. The session lifetime is not extended.
    pub fn apply_refresh(&mut self, tokens: TokenPair) {
        self.access_token = tokens.access_token;
        if tokens.refresh_token.is_some() {
            self.refresh_token = tokens.refresh_token;
        }
        self.access_expires_at = tokens.expires_at;
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }
}

/// CSRF state and PKCE verifier carried across the provider redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthState {
    pub csrf: String,
    pub verifier: String,
    pub callback_url: String,
    pub exp: i64,
}

impl OAuthState {
    pub fn new(request: &AuthorizationRequest, callback_url: &str, now: DateTime<Utc>) -> Self {
        OAuthState {
            csrf: request.csrf_state.clone(),
            verifier: request.pkce_verifier.clone(),
            callback_url: callback_url.to_string(),
            exp: now.timestamp() + OAUTH_STATE_TTL_SECS,
        }
    }

    pub fn verify(&self, returned_state: &str) -> Result<(), AuthError> {
        if self.csrf == returned_state {
            Ok(())
        } else {
            Err(AuthError::StateMismatch)
        }
    }
}

/// Signs and verifies cookie payloads with HS256.
#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

impl SessionCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        SessionCodec {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn encode(&self, session: &Session) -> Result<String, AuthError> {
        self.encode_claims(session)
    }

    /// Verify and decode a session token. A session without an access token
    /// is rejected here so callers never see one.
    pub fn decode(&self, token: &str) -> Result<Session, AuthError> {
        let session: Session = self.decode_claims(token)?;
        if session.access_token.is_empty() {
            return Err(AuthError::MissingAccessToken);
        }
        Ok(session)
    }

    pub fn encode_state(&self, state: &OAuthState) -> Result<String, AuthError> {
        self.encode_claims(state)
    }

    pub fn decode_state(&self, token: &str) -> Result<OAuthState, AuthError> {
        self.decode_claims(token)
    }

    fn encode_claims<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::InvalidConfig(e.to_string()))
    }

    fn decode_claims<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        jsonwebtoken::decode::<T>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected signed cookie");
                AuthError::InvalidSession
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tokens() -> TokenPair {
        TokenPair {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            expires_at: Some(Utc::now().timestamp() + 3600),
        }
    }

    #[test]
    fn test_session_ttl_is_24_hours() {
        let now = Utc::now();
        let session = Session::new(tokens(), UserProfile::default(), now);
        assert_eq!(session.expires_at - session.issued_at, SESSION_TTL_SECS);
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::hours(24)));
    }

    #[test]
    fn test_codec_verifies_signature() {
        let codec = SessionCodec::new(b"secret");
        let user = UserProfile {
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            picture: None,
        };
        let session = Session::new(tokens(), user, Utc::now());
        let token = codec.encode(&session).unwrap();
        assert_eq!(codec.decode(&token).unwrap(), session);

        let other = SessionCodec::new(b"other");
        assert!(matches!(other.decode(&token), Err(AuthError::InvalidSession)));
        assert!(matches!(codec.decode("garbage"), Err(AuthError::InvalidSession)));
    }

    #[test]
    fn test_expired_session_is_invalid() {
        let codec = SessionCodec::new(b"secret");
        let session = Session::new(tokens(), UserProfile::default(), Utc::now() - Duration::days(2));
        let token = codec.encode(&session).unwrap();
        assert!(matches!(codec.decode(&token), Err(AuthError::InvalidSession)));
    }

    #[test]
    fn test_empty_access_token_rejected() {
        let codec = SessionCodec::new(b"secret");
        let mut session = Session::new(tokens(), UserProfile::default(), Utc::now());
        session.access_token.clear();
        let token = codec.encode(&session).unwrap();
        assert!(matches!(codec.decode(&token), Err(AuthError::MissingAccessToken)));
    }

    #[test]
    fn test_access_token_expiry_and_refresh() {
        let now = Utc::now();
        let mut session = Session::new(tokens(), UserProfile::default(), now);
        let original_exp = session.expires_at;
        assert!(!session.access_token_expired(now));
        assert!(session.access_token_expired(now + Duration::seconds(3590)));

        session.apply_refresh(TokenPair {
            access_token: "fresh".into(),
            refresh_token: None,
            expires_at: Some(now.timestamp() + 7200),
        });
        assert_eq!(session.access_token, "fresh");
        assert_eq!(session.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(session.expires_at, original_exp);
        assert!(!session.access_token_expired(now + Duration::seconds(3590)));
    }

    #[test]
    fn test_oauth_state_round_trip() {
        let codec = SessionCodec::new(b"secret");
        let request = AuthorizationRequest {
            url: "https://accounts.example/auth".into(),
            csrf_state: "csrf".into(),
            pkce_verifier: "verifier".into(),
        };
        let state = OAuthState::new(&request, "/dashboard", Utc::now());
        let decoded = codec.decode_state(&codec.encode_state(&state).unwrap()).unwrap();
        assert_eq!(decoded, state);
        assert!(decoded.verify("csrf").is_ok());
        assert!(matches!(decoded.verify("forged"), Err(AuthError::StateMismatch)));
    }
}
