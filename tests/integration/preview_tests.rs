//! Preview route integration tests.
//!
//! Tests verify:
//! - Non-chat clients are redirected to the origin without extraction
//! - Chat clients get OpenGraph / Twitter-card HTML
//! - Image URLs are cached for the mosaic route
//! - Video URLs are rewritten through the media proxy

use axum::body::Body;
use axum::http::{header, Request, StatusCode};

use fxtg::cache_key;
use fxtg::proxy::token::decode_str;

use super::test_utils::{
    body_bytes, body_json, png, MockExtractor, MockUpstream, TestApp, BASE_URL, CDN,
};

const TELEGRAM_UA: &str = "TelegramBot (like TwitterBot)";

const TWO_PHOTOS: &str = r#"{
    "description": "Sunset <over> the bay",
    "media": [
        {"url": "https://scontent.cdninstagram.com/v/a.jpg", "type": "photo"},
        {"url": "https://scontent.cdninstagram.com/v/b.jpg", "type": "photo"}
    ],
    "authorName": "Alice",
    "userName": "alice"
}"#;

const ONE_PHOTO: &str = r#"{
    "description": "",
    "media": [
        {"url": "https://scontent.cdninstagram.com/v/a.jpg", "type": "photo", "alt": "A lighthouse"}
    ]
}"#;

const VIDEO: &str = r#"{
    "description": "Clip",
    "media": [
        {"url": "https://scontent.cdninstagram.com/v/thumb.jpg", "type": "thumbnail"},
        {"url": "https://scontent.cdninstagram.com/v/clip.mp4?efg=abc", "type": "video"}
    ]
}"#;

const TEXT_ONLY: &str = r#"{"description": "Just words", "media": []}"#;

fn telegram(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::USER_AGENT, TELEGRAM_UA)
        .body(Body::empty())
        .unwrap()
}

async fn preview_html(app: &TestApp, uri: &str) -> String {
    let response = app.send(telegram(uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

// =============================================================================
// Redirects
// =============================================================================

#[tokio::test]
async fn test_browser_is_redirected_to_origin() {
    let extractor = MockExtractor::returning(TWO_PHOTOS);
    let app = TestApp::new(MockUpstream::new(), Some(extractor.clone())).await;

    let request = Request::builder()
        .uri("/alice/post/C8x")
        .header(header::USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64)")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://www.threads.net/alice/post/C8x"
    );
    assert_eq!(extractor.calls(), 0);
    assert!(app.cache.is_empty().await);
}

#[tokio::test]
async fn test_missing_user_agent_is_redirected() {
    let extractor = MockExtractor::returning(TWO_PHOTOS);
    let app = TestApp::new(MockUpstream::new(), Some(extractor.clone())).await;

    let response = app.get("/alice/post/C8x").await;

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(extractor.calls(), 0);
}

// =============================================================================
// Preview Pages
// =============================================================================

#[tokio::test]
async fn test_multi_photo_preview_uses_mosaic() {
    let extractor = MockExtractor::returning(TWO_PHOTOS);
    let app = TestApp::new(MockUpstream::new(), Some(extractor.clone())).await;

    let html = preview_html(&app, "/alice/post/C8x").await;

    let mosaic_url = format!("{}/mosaic/alice/post/C8x", BASE_URL);
    assert!(html.contains(&format!(
        r#"<meta property="og:image" content="{}">"#,
        mosaic_url
    )));
    assert!(html.contains(r#"content="summary_large_image""#));
    assert!(html.contains(r#"content="Thread from alice""#));
    assert!(html.contains(r#"content="https://www.threads.net/alice/post/C8x""#));
    assert!(html.contains("Sunset &lt;over&gt; the bay"));
    assert!(!html.contains("og:video"));

    assert_eq!(extractor.calls(), 1);
    assert_eq!(
        extractor.last_url().await.as_deref(),
        Some("https://www.threads.net/alice/post/C8x")
    );

    // The image URLs are cached for the mosaic route, in post order.
    assert_eq!(
        app.cache.get(&cache_key("alice", "C8x")).await,
        Some(vec![
            format!("{}/v/a.jpg", CDN),
            format!("{}/v/b.jpg", CDN)
        ])
    );
}

#[tokio::test]
async fn test_single_photo_preview_links_photo_directly() {
    let app = TestApp::new(MockUpstream::new(), Some(MockExtractor::returning(ONE_PHOTO))).await;

    let html = preview_html(&app, "/bob/post/D9y").await;

    assert!(html.contains(&format!(
        r#"<meta property="og:image" content="{}/v/a.jpg">"#,
        CDN
    )));
    assert!(!html.contains("/mosaic/"));

    // Blank description falls back to the photo's alt text.
    assert!(html.contains(r#"content="A lighthouse""#));
}

#[tokio::test]
async fn test_video_preview_is_proxied() {
    let app = TestApp::new(MockUpstream::new(), Some(MockExtractor::returning(VIDEO))).await;

    let html = preview_html(&app, "/carol/post/E1z").await;

    assert!(html.contains(r#"content="player""#));
    assert!(html.contains("og:video:url"));
    assert!(html.contains(r#"content="video/mp4""#));
    assert!(!html.contains("summary_large_image"));
    assert!(html.contains(&format!(
        r#"<meta property="og:image" content="{}/v/thumb.jpg">"#,
        CDN
    )));

    // Pull the proxied URL back out of the page and check it decodes to the CDN URL.
    let marker = r#"<meta property="og:video:url" content=""#;
    let start = html.find(marker).unwrap() + marker.len();
    let end = start + html[start..].find('"').unwrap();
    let proxied = html[start..end].replace("&amp;", "&");

    assert!(proxied.starts_with(&format!("{}/media_download?", BASE_URL)));
    assert!(proxied.ends_with("&0.mp4"));

    let token = decode_str(&proxied).unwrap();
    assert_eq!(
        token.upstream_url().unwrap().as_str(),
        format!("{}/v/clip.mp4?efg=abc", CDN)
    );

    // The thumbnail is the only image of the post and is cached.
    assert_eq!(
        app.cache.get(&cache_key("carol", "E1z")).await,
        Some(vec![format!("{}/v/thumb.jpg", CDN)])
    );
}

#[tokio::test]
async fn test_text_only_preview() {
    let app = TestApp::new(MockUpstream::new(), Some(MockExtractor::returning(TEXT_ONLY))).await;

    let html = preview_html(&app, "/dave/post/F2a").await;

    assert!(!html.contains("twitter:card"));
    assert!(html.contains(r#"content="Just words""#));
    assert_eq!(
        app.cache.get(&cache_key("dave", "F2a")).await,
        Some(Vec::new())
    );
}

#[tokio::test]
async fn test_preview_then_mosaic() {
    let upstream = MockUpstream::new()
        .with_file(&format!("{}/v/a.jpg", CDN), png(30, 30, [0, 255, 0, 255]), "image/png")
        .with_file(&format!("{}/v/b.jpg", CDN), png(30, 30, [0, 0, 255, 255]), "image/png");
    let app = TestApp::new(upstream, Some(MockExtractor::returning(TWO_PHOTOS))).await;

    preview_html(&app, "/alice/post/C8x").await;

    let response = app.get("/mosaic/alice/post/C8x").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_extractor_failure_is_bad_gateway() {
    let extractor = MockExtractor::failing();
    let app = TestApp::new(MockUpstream::new(), Some(extractor.clone())).await;

    let response = app.send(telegram("/alice/post/C8x")).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"], "extract_error");
    assert_eq!(extractor.calls(), 1);
    assert!(app.cache.is_empty().await);
}

#[tokio::test]
async fn test_preview_route_absent_without_extractor() {
    let app = TestApp::new(MockUpstream::new(), None).await;

    let response = app.send(telegram("/alice/post/C8x")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new(MockUpstream::new(), None).await;

    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}
