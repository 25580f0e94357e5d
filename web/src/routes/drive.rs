use crate::{with_cookie, ApiError, AuthSession, SharedState, ThumbnailMode};
use api_client::{is_valid_file_id, upscale_thumbnail_link, ApiClientError, Download, DEFAULT_PAGE_SIZE};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;

const THUMBNAIL_CACHE: &str = "public, max-age=86400, immutable";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaQuery {
    page_token: Option<String>,
}

#[cfg_attr(feature = "trace-spans", tracing::instrument(skip_all))]
pub(crate) async fn list_media(
    State(state): State<SharedState>,
    auth: AuthSession,
    Query(query): Query<MediaQuery>,
) -> Result<Response, ApiError> {
    let client = state.drive_client(&auth.session.access_token);
    let page = client
        .list_media_files(DEFAULT_PAGE_SIZE, query.page_token.as_deref())
        .await?;
    tracing::debug!(
        count = page.files.len(),
        more = page.next_page_token.is_some(),
        "Listed media"
    );
    Ok(with_cookie(Json(page).into_response(), auth.refreshed_cookie))
}

fn binary(download: Download, content_type: String) -> Response {
    let body = Body::from_stream(download.into_response().bytes_stream());
    (
        [
            (CONTENT_TYPE, content_type),
            (CACHE_CONTROL, THUMBNAIL_CACHE.to_string()),
        ],
        body,
    )
        .into_response()
}

fn not_found(file_id: &str, step: &str, err: ApiClientError) -> ApiError {
    tracing::warn!(target: "upstream", file_id, step, error = %err, "Thumbnail unavailable");
    ApiError::NotFound
}

/// Preview for one file: the upscaled provider thumbnail when there is one,
/// otherwise the raw content.
#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(state, auth)))]
pub(crate) async fn thumbnail(
    State(state): State<SharedState>,
    auth: AuthSession,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    if !is_valid_file_id(&file_id) {
        tracing::warn!(file_id = %file_id, "Rejected malformed file id");
        return Err(ApiError::NotFound);
    }
    let client = state.drive_client(&auth.session.access_token);
    let meta = client
        .get_file_metadata(&file_id)
        .await
        .map_err(|e| not_found(&file_id, "metadata", e))?;

    if let Some(link) = meta.thumbnail_link.as_deref() {
        let url = upscale_thumbnail_link(link, state.settings.thumbnail_size);
        match state.settings.thumbnail_mode {
            ThumbnailMode::Redirect => {
                return Ok(with_cookie(
                    Redirect::temporary(&url).into_response(),
                    auth.refreshed_cookie,
                ));
            }
            ThumbnailMode::Proxy => match client.fetch_url(&url).await {
                Ok(download) => {
                    let content_type = download
                        .content_type
                        .clone()
                        .filter(|ct| ct.starts_with("image/"))
                        .unwrap_or_else(|| "image/jpeg".to_string());
                    return Ok(with_cookie(
                        binary(download, content_type),
                        auth.refreshed_cookie,
                    ));
                }
                Err(e) => {
                    tracing::debug!(file_id = %file_id, error = %e, "Thumbnail link failed, streaming content");
                }
            },
        }
    }

    let download = client
        .download_content(&file_id)
        .await
        .map_err(|e| not_found(&file_id, "content", e))?;
    let content_type = download
        .content_type
        .clone()
        .or(meta.mime_type)
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(with_cookie(
        binary(download, content_type),
        auth.refreshed_cookie,
    ))
}
