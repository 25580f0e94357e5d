//! API client module for Google Drive.

mod media;

pub use media::{format_file_size, upscale_thumbnail_link, MediaFile, MediaKind, MediaPage};

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const DRIVE_API_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const MEDIA_QUERY: &str =
    "(mimeType contains 'image/' or mimeType contains 'video/') and trashed = false";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, thumbnailLink, webViewLink, \
     size, createdTime, imageMediaMetadata(width, height, rotation), \
     videoMediaMetadata(width, height))";
const METADATA_FIELDS: &str = "id, mimeType, thumbnailLink";

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("Request Error: {0}")]
    Request(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Not found")]
    NotFound,
    #[error("Google API Error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Decode Error: {0}")]
    Decode(String),
    #[error("Invalid file id: {0:?}")]
    InvalidFileId(String),
}

/// Drive ids are URL-safe base64-like strings. Anything else is refused
/// before it can be spliced into a request path.
pub fn is_valid_file_id(file_id: &str) -> bool {
    !file_id.is_empty()
        && file_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl From<reqwest::Error> for ApiClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiClientError::Timeout
        } else if e.is_decode() {
            ApiClientError::Decode(e.to_string())
        } else {
            ApiClientError::Request(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    files: Option<Vec<DriveFile>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: Option<String>,
    name: Option<String>,
    mime_type: Option<String>,
    thumbnail_link: Option<String>,
    web_view_link: Option<String>,
    size: Option<String>,
    created_time: Option<DateTime<Utc>>,
    image_media_metadata: Option<ImageMediaMetadata>,
    video_media_metadata: Option<VideoMediaMetadata>,
}

#[derive(Debug, Deserialize)]
struct ImageMediaMetadata {
    width: Option<u32>,
    height: Option<u32>,
    rotation: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct VideoMediaMetadata {
    width: Option<u32>,
    height: Option<u32>,
}

impl DriveFile {
    fn dimensions(&self) -> (Option<u32>, Option<u32>) {
        if let Some(meta) = &self.image_media_metadata {
            if let (Some(w), Some(h)) = (meta.width, meta.height) {
                // Quarter-turn rotations store the sensor size, not the display size.
                return match meta.rotation {
                    Some(r) if r.rem_euclid(2) == 1 => (Some(h), Some(w)),
                    _ => (Some(w), Some(h)),
                };
            }
        }
        match &self.video_media_metadata {
            Some(meta) => (meta.width, meta.height),
            None => (None, None),
        }
    }

    /// Drops entries without an id or with a non-visual MIME type.
    fn into_media_file(self) -> Option<MediaFile> {
        let (width, height) = self.dimensions();
        let id = self.id.filter(|id| !id.is_empty())?;
        let mime_type = self.mime_type?;
        MediaKind::from_mime(&mime_type)?;
        Some(MediaFile {
            id,
            name: self.name.unwrap_or_default(),
            mime_type,
            thumbnail_link: self.thumbnail_link,
            web_view_link: self.web_view_link,
            size: self.size.and_then(|s| s.parse().ok()),
            created_time: self.created_time,
            width,
            height,
        })
    }
}

/// The subset of file metadata the thumbnail proxy needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: Option<String>,
    pub mime_type: Option<String>,
    pub thumbnail_link: Option<String>,
}

/// A successful binary response whose body has not been read yet.
#[derive(Debug)]
pub struct Download {
    pub content_type: Option<String>,
    response: reqwest::Response,
}

impl Download {
    pub fn into_response(self) -> reqwest::Response {
        self.response
    }

    pub async fn bytes(self) -> Result<Vec<u8>, ApiClientError> {
        Ok(self.response.bytes().await?.to_vec())
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

impl ApiClient {
    pub fn new(access_token: String) -> Self {
        Self::with_base_url(access_token, DRIVE_API_URL.to_string())
    }

    /// Create a new client with a custom API base URL. Mainly used for testing.
    pub fn with_base_url(access_token: String, base_url: String) -> Self {
        ApiClient {
            client: build_http_client(DEFAULT_TIMEOUT),
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self
    }

    pub fn set_access_token(&mut self, token: String) {
        self.access_token = token;
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.base_url)
    }

    fn file_url(&self, file_id: &str) -> Result<reqwest::Url, ApiClientError> {
        if !is_valid_file_id(file_id) {
            return Err(ApiClientError::InvalidFileId(file_id.to_string()));
        }
        let mut url = reqwest::Url::parse(&self.files_url())
            .map_err(|e| ApiClientError::Request(format!("Invalid API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiClientError::Request("API URL cannot take a path".to_string()))?
            .push(file_id);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiClientError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiClientError::NotFound);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// List images and videos, newest first.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn list_media_files(
        &self,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MediaPage, ApiClientError> {
        let mut query = vec![
            ("pageSize", page_size.to_string()),
            ("q", MEDIA_QUERY.to_string()),
            ("orderBy", "createdTime desc".to_string()),
            ("fields", LIST_FIELDS.to_string()),
        ];
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .client
            .get(self.files_url())
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .query(&query)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let list = response.json::<FileListResponse>().await?;

        let raw = list.files.unwrap_or_default();
        let received = raw.len();
        let files: Vec<MediaFile> = raw
            .into_iter()
            .filter_map(DriveFile::into_media_file)
            .collect();
        if files.len() != received {
            tracing::debug!(
                dropped = received - files.len(),
                "Dropped non-media entries from listing"
            );
        }

        Ok(MediaPage {
            files,
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    pub async fn get_file_metadata(&self, file_id: &str) -> Result<FileMetadata, ApiClientError> {
        let response = self
            .client
            .get(self.file_url(file_id)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .query(&[("fields", METADATA_FIELDS)])
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json::<FileMetadata>().await?)
    }

    /// Raw file content (`alt=media`).
    pub async fn download_content(&self, file_id: &str) -> Result<Download, ApiClientError> {
        let response = self
            .client
            .get(self.file_url(file_id)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .query(&[("alt", "media")])
            .send()
            .await?;
        Self::into_download(Self::check(response).await?)
    }

    /// Fetch an absolute URL (typically a thumbnail link) with the caller's token.
    pub async fn fetch_url(&self, url: &str) -> Result<Download, ApiClientError> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .send()
            .await?;
        Self::into_download(Self::check(response).await?)
    }

    fn into_download(response: reqwest::Response) -> Result<Download, ApiClientError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        Ok(Download {
            content_type,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_list_response() {
        let json = r#"{
            "files": [
                {
                    "id": "1",
                    "name": "IMG_0001.jpg",
                    "mimeType": "image/jpeg",
                    "thumbnailLink": "https://lh3.googleusercontent.com/x=s220",
                    "size": "2048",
                    "createdTime": "2023-01-01T00:00:00.000Z",
                    "imageMediaMetadata": { "width": 4000, "height": 3000, "rotation": 1 }
                },
                { "id": "2", "name": "notes.txt", "mimeType": "text/plain" },
                {
                    "id": "3",
                    "name": "clip.mp4",
                    "mimeType": "video/mp4",
                    "videoMediaMetadata": { "width": 1920, "height": 1080 }
                }
            ],
            "nextPageToken": "token123"
        }"#;

        let parsed: FileListResponse = serde_json::from_str(json).unwrap();
        let files: Vec<MediaFile> = parsed
            .files
            .unwrap()
            .into_iter()
            .filter_map(DriveFile::into_media_file)
            .collect();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].size, Some(2048));
        assert_eq!(files[0].dimensions(), Some((3000, 4000)));
        assert_eq!(files[1].kind(), Some(MediaKind::Video));
        assert_eq!(files[1].dimensions(), Some((1920, 1080)));
        assert_eq!(parsed.next_page_token.as_deref(), Some("token123"));
    }

    #[test]
    fn test_entry_without_id_is_dropped() {
        let file = DriveFile {
            id: None,
            name: Some("a.jpg".into()),
            mime_type: Some("image/jpeg".into()),
            thumbnail_link: None,
            web_view_link: None,
            size: None,
            created_time: None,
            image_media_metadata: None,
            video_media_metadata: None,
        };
        assert!(file.into_media_file().is_none());
    }

    #[test]
    fn test_file_url_stays_under_files() {
        let client = ApiClient::with_base_url("t".into(), "http://drive.test".into());
        assert_eq!(
            client.file_url("1AbC-d_9").unwrap().as_str(),
            "http://drive.test/drive/v3/files/1AbC-d_9"
        );
        for id in ["", "..", "../../oauth2/v2/userinfo", "a?alt=media", "a/b", "a%2Fb"] {
            assert!(
                matches!(client.file_url(id), Err(ApiClientError::InvalidFileId(_))),
                "{id:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_list_sends_query_and_token() {
        use httpmock::prelude::*;

        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/drive/v3/files")
                .header("authorization", "Bearer test")
                .query_param("pageSize", "20")
                .query_param("pageToken", "next")
                .query_param("orderBy", "createdTime desc")
                .query_param("q", MEDIA_QUERY);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"files": [], "nextPageToken": ""}"#);
        });

        let client = ApiClient::with_base_url("test".into(), server.url(""));
        let page = client
            .list_media_files(DEFAULT_PAGE_SIZE, Some("next"))
            .await
            .unwrap();
        mock.assert();
        assert!(page.files.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
