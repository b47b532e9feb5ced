use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("Error fetching URL: upstream returned {status}")]
    Upstream { status: StatusCode },
    #[error("Error fetching URL: {0}")]
    Request(String),
    #[error("No media found. This may be a private post or Instagram structure changed.")]
    MediaNotFound,
    #[error("Video URL not found. Reel might be private or unavailable.")]
    NotVideo,
}

impl ScrapeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ScrapeError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ScrapeError::Upstream { .. } | ScrapeError::Request(_) => StatusCode::BAD_GATEWAY,
            ScrapeError::MediaNotFound | ScrapeError::NotVideo => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            tracing::warn!(%status, %detail, "request failed");
        } else {
            tracing::debug!(%status, %detail, "request rejected");
        }
        (status, Json(json!({"success": false, "detail": detail}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_are_bad_gateway() {
        let non_2xx = ScrapeError::Upstream {
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(non_2xx.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ScrapeError::Request("ConnectError: refused".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            ScrapeError::InvalidUrl("Invalid URL".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ScrapeError::MediaNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ScrapeError::NotVideo.status(), StatusCode::NOT_FOUND);
    }
}
