//! HTTP request handlers.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /media_download?...` - Tokenized media proxy
//! - `GET /mosaic/{username}/post/{post_id}` - PNG mosaic of a cached post's images
//! - `GET /{username}/post/{post_id}` - Preview page (chat clients) or redirect (everyone else)

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{OriginalUri, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::{cache_key, TtlCache};
use crate::error::{ExtractError, MosaicError, ProxyError, TokenError};
use crate::mosaic::{encode_png, load_images, LayoutOptions, Mosaic, DEFAULT_MOSAIC_WIDTH};
use crate::post::PostExtractor;
use crate::proxy::{generate_nonce, media_download_url, MediaProxy, Upstream};

use super::preview::PreviewPage;

/// Default origin that posts are fetched from and redirected to.
pub const DEFAULT_ORIGIN_URL: &str = "https://www.threads.net";

/// Substring identifying chat clients that get the preview page.
pub const PREVIEW_USER_AGENT: &str = "Telegram";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<U: Upstream> {
    /// Post key → image URLs, shared with the sweeper
    pub cache: Arc<TtlCache>,

    /// Media proxy, also the client used to fetch mosaic sources
    pub proxy: Arc<MediaProxy<U>>,

    /// Post extractor; the preview route is disabled without one
    pub extractor: Option<Arc<dyn PostExtractor>>,

    /// Public base URL used in generated links
    pub base_url: String,

    /// Origin site that non-preview clients are redirected to
    pub origin_url: String,

    /// Mosaic output width in pixels
    pub mosaic_width: u32,

    /// Mosaic layout search bounds
    pub layout: LayoutOptions,
}

impl<U: Upstream> AppState<U> {
    /// Create application state with default origin and mosaic settings.
    pub fn new(cache: Arc<TtlCache>, proxy: MediaProxy<U>, base_url: impl Into<String>) -> Self {
        Self {
            cache,
            proxy: Arc::new(proxy),
            extractor: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            origin_url: DEFAULT_ORIGIN_URL.to_string(),
            mosaic_width: DEFAULT_MOSAIC_WIDTH,
            layout: LayoutOptions::default(),
        }
    }

    /// Enable the preview route.
    pub fn with_extractor(mut self, extractor: Arc<dyn PostExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_origin_url(mut self, origin_url: impl Into<String>) -> Self {
        self.origin_url = origin_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_mosaic_width(mut self, width: u32) -> Self {
        self.mosaic_width = width;
        self
    }

    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    /// Canonical post URL on the origin site.
    pub fn post_url(&self, username: &str, post_id: &str) -> String {
        format!("{}/{}/post/{}", self.origin_url, username, post_id)
    }

    /// Public URL of the mosaic for a post.
    pub fn mosaic_url(&self, username: &str, post_id: &str) -> String {
        format!(
            "{}/mosaic/{}/post/{}",
            self.base_url,
            urlencoding::encode(username),
            urlencoding::encode(post_id)
        )
    }
}

impl<U: Upstream> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            proxy: Arc::clone(&self.proxy),
            extractor: self.extractor.clone(),
            base_url: self.base_url.clone(),
            origin_url: self.origin_url.clone(),
            mosaic_width: self.mosaic_width,
            layout: self.layout,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned by the non-proxy routes.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "upstream_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

fn log_by_severity(status: StatusCode, error_type: &str, message: &str) {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else if status.is_client_error() {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }
}

/// Convert ProxyError to a plain-text HTTP response.
///
/// Whitelist rejections are logged at WARN with the offending host, since
/// they usually mean someone is probing for an open proxy.
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ProxyError::InvalidToken(_) => (StatusCode::BAD_REQUEST, "invalid_token"),
            ProxyError::HostNotWhitelisted { host } => {
                warn!(host = %host, "Rejected media request for non-whitelisted host");
                (StatusCode::BAD_REQUEST, "host_not_whitelisted")
            }
            ProxyError::InvalidRange(_) => (StatusCode::BAD_REQUEST, "invalid_range"),
            ProxyError::RangeNotSatisfiable { .. } => {
                (StatusCode::RANGE_NOT_SATISFIABLE, "range_not_satisfiable")
            }
            ProxyError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
        };

        let message = self.to_string();
        log_by_severity(status, error_type, &message);

        match self {
            ProxyError::RangeNotSatisfiable { size, .. } => (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{}", size))],
                message,
            )
                .into_response(),
            _ => (status, message).into_response(),
        }
    }
}

/// Errors from the mosaic and preview routes, rendered as JSON.
#[derive(Debug)]
pub enum HandlerError {
    NotFound(String),
    BadRequest(String),
    Mosaic(MosaicError),
    Extract(ExtractError),
}

impl From<MosaicError> for HandlerError {
    fn from(err: MosaicError) -> Self {
        HandlerError::Mosaic(err)
    }
}

impl From<ExtractError> for HandlerError {
    fn from(err: ExtractError) -> Self {
        HandlerError::Extract(err)
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            HandlerError::NotFound(message) => {
                (StatusCode::NOT_FOUND, "not_found", message.clone())
            }
            HandlerError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "invalid_request", message.clone())
            }

            // 400 Bad Request - unusable layout inputs
            HandlerError::Mosaic(
                err @ (MosaicError::NoImages
                | MosaicError::ZeroWidth
                | MosaicError::InvalidImage { .. }
                | MosaicError::TooLarge { .. }
                | MosaicError::InvalidOptions(_)),
            ) => (StatusCode::BAD_REQUEST, "invalid_mosaic", err.to_string()),

            HandlerError::Mosaic(err @ MosaicError::Fetch { .. }) => {
                (StatusCode::BAD_GATEWAY, "upstream_error", err.to_string())
            }

            HandlerError::Mosaic(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "mosaic_error",
                err.to_string(),
            ),

            HandlerError::Extract(err) => {
                (StatusCode::BAD_GATEWAY, "extract_error", err.to_string())
            }
        };

        log_by_severity(status, error_type, &message);

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Rebuild the absolute URL the client asked for.
fn request_url(headers: &HeaderMap, uri: &http::Uri) -> Result<Url, ProxyError> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");

    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let raw = format!("http://{}{}", host, path_and_query);

    Url::parse(&raw).map_err(|e| ProxyError::InvalidToken(TokenError::InvalidUrl(e.to_string())))
}

/// Stream an upstream media resource.
///
/// # Endpoint
///
/// `GET /media_download?<params>&___host=..&___pathname=..&___t=..&0.mp4`
///
/// # Response
///
/// - `200 OK`: full body, streamed
/// - `206 Partial Content`: requested byte range, streamed
/// - `400 Bad Request`: bad token, non-whitelisted host, malformed `Range`
/// - `416 Range Not Satisfiable`: range starts past the end of the resource
/// - `502 Bad Gateway`: upstream failure before headers were sent
///
/// # Headers
///
/// - `Content-Type`, `Content-Length`, `Accept-Ranges: bytes`
/// - `Content-Range: bytes {start}-{end}/{total}` on 206
pub async fn media_download_handler<U: Upstream + 'static>(
    State(state): State<AppState<U>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let local = request_url(&headers, &uri)?;
    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    let media = state.proxy.open(&local, range_header).await?;

    let status = if media.range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let content_length = media.content_length().to_string();
    let content_range = media.range.map(|r| r.content_range());

    let body = Body::from_stream(media.body.inspect_err(|e| {
        // Headers are already out; all we can do is log and drop the connection.
        error!(error = %e, "Upstream stream failed mid-response");
    }));

    let mut response = (
        status,
        [
            (header::CONTENT_TYPE, media.content_type),
            (header::CONTENT_LENGTH, content_length),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
        body,
    )
        .into_response();

    if let Some(content_range) = content_range {
        if let Ok(value) = content_range.parse() {
            response.headers_mut().insert(header::CONTENT_RANGE, value);
        }
    }

    Ok(response)
}

/// Render the mosaic for a cached post.
///
/// # Endpoint
///
/// `GET /mosaic/{username}/post/{post_id}`
///
/// # Response
///
/// - `200 OK`: `image/png`
/// - `400 Bad Request`: the images cannot be laid out within the canvas limits
/// - `404 Not Found`: no image URLs cached for this post
/// - `502 Bad Gateway`: a source image could not be fetched
/// - `500 Internal Server Error`: decode or encode failure
pub async fn mosaic_handler<U: Upstream + 'static>(
    State(state): State<AppState<U>>,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<Response, HandlerError> {
    let key = cache_key(&username, &post_id);

    let urls = state.cache.get(&key).await.unwrap_or_default();
    if urls.is_empty() {
        return Err(HandlerError::NotFound(format!(
            "No image URLs cached for {}",
            key
        )));
    }

    let images = load_images(state.proxy.upstream().as_ref(), &urls).await?;

    let width = state.mosaic_width;
    let layout = state.layout;
    let png = tokio::task::spawn_blocking(move || {
        let mosaic = Mosaic::new(&images, width)?;
        let canvas = mosaic.render(&layout)?;
        encode_png(&canvas)
    })
    .await
    .map_err(|e| MosaicError::EncodeError {
        message: format!("render task failed: {}", e),
    })??;

    debug!(key = %key, images = urls.len(), bytes = png.len(), "Rendered mosaic");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png")],
        png,
    )
        .into_response())
}

/// Serve a post preview.
///
/// # Endpoint
///
/// `GET /{username}/post/{post_id}`
///
/// # Response
///
/// - `301 Moved Permanently`: the client is not a chat preview bot; go to the origin
/// - `200 OK`: OpenGraph / Twitter-card HTML
/// - `502 Bad Gateway`: the extractor failed or returned an invalid record
pub async fn preview_handler<U: Upstream + 'static>(
    State(state): State<AppState<U>>,
    Path((username, post_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    let post_url = state.post_url(&username, &post_id);

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if !user_agent.contains(PREVIEW_USER_AGENT) {
        debug!(user_agent = %user_agent, url = %post_url, "Redirecting to origin");
        return Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, post_url)]).into_response());
    }

    let extractor = state
        .extractor
        .as_ref()
        .ok_or_else(|| HandlerError::NotFound("Post previews are not enabled".to_string()))?;

    let parsed_post_url = Url::parse(&post_url)
        .map_err(|e| HandlerError::BadRequest(format!("Invalid post URL {}: {}", post_url, e)))?;

    let record = extractor.extract(&parsed_post_url).await?;

    let image_urls: Vec<String> = record.images().map(|m| m.url.clone()).collect();
    let video_urls = record
        .videos()
        .map(|video| {
            let upstream = Url::parse(&video.url)
                .map_err(|e| ExtractError::InvalidRecord(format!("{}: {}", video.url, e)))?;
            Ok(media_download_url(
                &state.base_url,
                &upstream,
                &generate_nonce(),
                "mp4",
            ))
        })
        .collect::<Result<Vec<_>, ExtractError>>()?;

    let key = cache_key(&username, &post_id);
    if let Err(e) = state.cache.add(key.clone(), image_urls.clone()).await {
        error!(key = %key, error = %e, "Failed to persist image URLs");
    }

    info!(
        key = %key,
        images = image_urls.len(),
        videos = video_urls.len(),
        "Serving post preview"
    );

    let page = PreviewPage::from_record(
        &record,
        &username,
        &post_url,
        &state.mosaic_url(&username, &post_id),
        &video_urls,
    );

    Ok(Html(page.render()).into_response())
}

// =============================================================================
// Tests
// =============================================================================
