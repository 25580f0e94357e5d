//! Where the gallery gets its pages and thumbnails from.

use api_client::MediaPage;
use async_trait::async_trait;
use auth::cookie::SESSION_COOKIE;
use auth::UserProfile;
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("Server Error ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Request Error: {0}")]
    Request(String),
    #[error("Decode Error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else {
            SourceError::Request(e.to_string())
        }
    }
}

#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<MediaPage, SourceError>;
    async fn fetch_thumbnail(&self, file_id: &str) -> Result<Vec<u8>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Who the server thinks we are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionInfo {
    pub user: Option<UserProfile>,
    pub expires: Option<String>,
}

/// Talks to the DrivePicz web endpoints with a session cookie.
#[derive(Debug, Clone)]
pub struct HttpMediaSource {
    client: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl HttpMediaSource {
    pub fn new(base_url: &str, session_token: Option<String>) -> Self {
        Self::with_timeout(base_url, session_token, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, session_token: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        HttpMediaSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: session_token.filter(|t| !t.is_empty()),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match &self.session_token {
            Some(token) => request.header(COOKIE, format!("{}={}", SESSION_COOKIE, token)),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
        let (error, message) = match body {
            Some(b) => (b.error, b.message),
            None => (None, None),
        };
        if status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::Unauthenticated(
                error.unwrap_or_else(|| "Not authenticated".to_string()),
            ));
        }
        Err(SourceError::Http {
            status: status.as_u16(),
            message: message.or(error).unwrap_or(text),
        })
    }

    pub async fn session(&self) -> Result<SessionInfo, SourceError> {
        let response = Self::check(self.get("/api/auth/session").send().await?).await?;
        Ok(response.json::<SessionInfo>().await?)
    }
}

#[async_trait]
impl MediaSource for HttpMediaSource {
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<MediaPage, SourceError> {
        let mut request = self.get("/api/drive/media");
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        let response = Self::check(request.send().await?).await?;
        Ok(response.json::<MediaPage>().await?)
    }

    async fn fetch_thumbnail(&self, file_id: &str) -> Result<Vec<u8>, SourceError> {
        if !api_client::is_valid_file_id(file_id) {
            return Err(SourceError::Http {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: format!("Invalid file id: {:?}", file_id),
            });
        }
        let response = Self::check(
            self.get(&format!("/api/drive/thumbnail/{}", file_id))
                .send()
                .await?,
        )
        .await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetch_page_sends_cookie_and_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/drive/media")
                .query_param("pageToken", "p2")
                .header("cookie", "drivepicz.session-token=abc");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"files":[{"id":"1","name":"a.jpg","mimeType":"image/jpeg"}],"nextPageToken":null}"#);
        });

        let source = HttpMediaSource::new(&server.base_url(), Some("abc".into()));
        let page = source.fetch_page(Some("p2")).await.unwrap();
        mock.assert();
        assert_eq!(page.files.len(), 1);
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_unauthenticated_maps_error_text() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/drive/media");
            then.status(401)
                .header("content-type", "application/json")
                .body(r#"{"error":"Not authenticated - No session"}"#);
        });

        let source = HttpMediaSource::new(&server.base_url(), None);
        match source.fetch_page(None).await {
            Err(SourceError::Unauthenticated(msg)) => {
                assert_eq!(msg, "Not authenticated - No session")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_prefers_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/drive/media");
            then.status(500)
                .body(r#"{"error":"Failed to fetch files","message":"quota exceeded"}"#);
        });

        let source = HttpMediaSource::new(&server.base_url(), Some("abc".into()));
        let err = source.fetch_page(None).await.unwrap_err();
        assert_eq!(err.to_string(), "Server Error (500): quota exceeded");
    }

    #[tokio::test]
    async fn test_thumbnail_rejects_path_like_ids() {
        let server = MockServer::start();
        let escaped = server.mock(|when, then| {
            when.method(GET).path_contains("userinfo");
            then.status(200).body("secret");
        });

        let source = HttpMediaSource::new(&server.base_url(), Some("abc".into()));
        let err = source
            .fetch_thumbnail("../../oauth2/v2/userinfo")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Http { status: 404, .. }));
        escaped.assert_hits(0);
    }
}
