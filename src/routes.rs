use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use url::Url;

use crate::error::ScrapeError;
use crate::extract::{self, Extraction};
use crate::fetch::Fetcher;
use crate::models::{
    DownloadData, DownloadResponse, InfoResponse, MediaKind, MediaQuery, ReelResponse,
};
use crate::normalize::normalize_url;

#[derive(Debug, Clone)]
pub struct AppState {
    pub fetcher: Fetcher,
    pub require_instagram_host: bool,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/info", get(info))
        .route("/api/fetch", get(proxy))
        .route("/api/download", get(download))
        .route("/api/reel", get(reel))
        .route("/api/redirect", get(redirect))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

// ── Resolution pipeline ──────────────────────────────────────────────────────

type MediaParams = Result<Query<MediaQuery>, QueryRejection>;

struct Resolved {
    shortcode: Option<String>,
    media_url: Url,
    extraction: Extraction,
}

impl Resolved {
    fn kind(&self) -> MediaKind {
        self.extraction.media.kind
    }

    /// The URL reported to JSON callers: the page's own string when it was
    /// already absolute, otherwise the resolved form.
    fn reported_url(&self) -> String {
        let raw = &self.extraction.media.url;
        if Url::parse(raw).is_ok() {
            raw.clone()
        } else {
            self.media_url.to_string()
        }
    }
}

/// Normalize, fetch and scrape the post behind the `url` parameter.
async fn resolve(state: &AppState, params: MediaParams) -> Result<Resolved, ScrapeError> {
    let Query(query) = params.map_err(|rejection| {
        ScrapeError::InvalidUrl(format!("Invalid query string: {}", rejection.body_text()))
    })?;
    let raw = query.url.unwrap_or_default();
    let post = normalize_url(&raw, state.require_instagram_host)?;
    tracing::debug!(input = %raw, page = %post.page, "resolving post");

    let html = state.fetcher.fetch_page(&post.page).await?;
    let extraction = extract::extract_media(&html, &post.page)?;
    let media_url = extraction
        .resolve(&post.page)
        .ok_or(ScrapeError::MediaNotFound)?;

    Ok(Resolved {
        shortcode: post.shortcode,
        media_url,
        extraction,
    })
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(json!({"message": "Instagram Media API"}))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn info(
    State(state): State<Arc<AppState>>,
    params: MediaParams,
) -> Result<Json<InfoResponse>, ScrapeError> {
    let resolved = resolve(&state, params).await?;
    Ok(Json(InfoResponse {
        success: true,
        media_url: resolved.reported_url(),
        kind: resolved.kind(),
        shortcode: resolved.shortcode,
        data: resolved.extraction.details,
    }))
}

async fn download(
    State(state): State<Arc<AppState>>,
    params: MediaParams,
) -> Result<Json<DownloadResponse>, ScrapeError> {
    let resolved = resolve(&state, params).await?;
    Ok(Json(DownloadResponse {
        success: true,
        data: DownloadData {
            media_url: resolved.reported_url(),
            kind: resolved.kind(),
            shortcode: resolved.shortcode,
            details: resolved.extraction.details,
        },
    }))
}

async fn reel(
    State(state): State<Arc<AppState>>,
    params: MediaParams,
) -> Result<Json<ReelResponse>, ScrapeError> {
    let resolved = resolve(&state, params).await?;
    if resolved.kind() != MediaKind::Video {
        return Err(ScrapeError::NotVideo);
    }
    Ok(Json(ReelResponse {
        success: true,
        video_url: resolved.reported_url(),
    }))
}

async fn proxy(
    State(state): State<Arc<AppState>>,
    params: MediaParams,
) -> Result<Response, ScrapeError> {
    let resolved = resolve(&state, params).await?;
    let upstream = state.fetcher.fetch_media(&resolved.media_url).await?;

    let mut headers = HeaderMap::new();
    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(resolved.kind().default_content_type()));
    headers.insert(CONTENT_TYPE, content_type);
    if let Some(len) = upstream.content_length() {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }

    tracing::info!(media = %resolved.media_url, "proxying media");
    Ok((headers, Body::from_stream(upstream.bytes_stream())).into_response())
}

async fn redirect(
    State(state): State<Arc<AppState>>,
    params: MediaParams,
) -> Result<Response, ScrapeError> {
    let resolved = resolve(&state, params).await?;
    let location = HeaderValue::from_str(resolved.media_url.as_str())
        .map_err(|_| ScrapeError::MediaNotFound)?;
    Ok((StatusCode::TEMPORARY_REDIRECT, [(LOCATION, location)]).into_response())
}
