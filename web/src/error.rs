use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated - {0}")]
    Unauthenticated(&'static str),
    #[error("Server misconfiguration: {0}")]
    Misconfigured(String),
    /// `detail` is logged but never sent to the client.
    #[error("{message}")]
    Upstream { message: String, detail: String },
    #[error("Not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthenticated(reason) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": format!("Not authenticated - {}", reason) }),
            ),
            ApiError::Misconfigured(message) => {
                tracing::error!(target: "config", %message, "Request rejected: server misconfigured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Server misconfiguration", "message": message }),
                )
            }
            ApiError::Upstream { message, detail } => {
                tracing::error!(target: "upstream", %message, %detail, "Provider request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to fetch files", "message": message }),
                )
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Not found" })),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<api_client::ApiClientError> for ApiError {
    fn from(err: api_client::ApiClientError) -> Self {
        use api_client::ApiClientError;
        let message = match &err {
            ApiClientError::Api { message, .. } => message.clone(),
            ApiClientError::Timeout => "Request to Google Drive timed out".to_string(),
            other => other.to_string(),
        };
        ApiError::Upstream {
            message,
            detail: format!("{:?}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Unauthenticated("No session").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Misconfigured("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_upstream_message_passthrough() {
        let err: ApiError = api_client::ApiClientError::Api {
            status: 403,
            message: "rate limited".into(),
        }
        .into();
        assert_eq!(err.to_string(), "rate limited");
    }
}
