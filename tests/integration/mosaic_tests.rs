//! Mosaic route integration tests.
//!
//! Tests verify:
//! - Cache misses are 404 with a JSON body
//! - Cached image URLs are fetched, laid out and returned as PNG
//! - Upstream failures surface as 502

use axum::http::{header, StatusCode};
use image::GenericImageView;

use fxtg::cache_key;

use super::test_utils::{body_bytes, body_json, png, MockUpstream, TestApp, CDN};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn image_url(name: &str) -> String {
    format!("{}/v/t51/{}.jpg?stp=dst-jpg", CDN, name)
}

#[tokio::test]
async fn test_mosaic_cache_miss_is_not_found() {
    let app = TestApp::new(MockUpstream::new(), None).await;

    let response = app.get("/mosaic/alice/post/C8x").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
    assert_eq!(app.upstream.request_count(), 0);
}

#[tokio::test]
async fn test_mosaic_renders_cached_images() {
    let upstream = MockUpstream::new()
        .with_file(&image_url("a"), png(50, 50, RED), "image/png")
        .with_file(&image_url("b"), png(80, 80, BLUE), "image/png");
    let app = TestApp::new(upstream, None).await;

    app.cache
        .add(cache_key("alice", "C8x"), vec![image_url("a"), image_url("b")])
        .await
        .unwrap();

    let response = app.get("/mosaic/alice/post/C8x").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let body = body_bytes(response).await;
    let decoded = image::load_from_memory(&body).unwrap();

    // Two squares at width 400 sit side by side.
    assert_eq!(decoded.dimensions(), (400, 200));
    assert_eq!(decoded.get_pixel(100, 100).0, RED);
    assert_eq!(decoded.get_pixel(300, 100).0, BLUE);

    // Only full-body GETs, one per source image.
    let requests = app.upstream.get_requests().await;
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|(method, _, range)| method == "GET" && range.is_none()));
}

#[tokio::test]
async fn test_mosaic_single_image() {
    let upstream = MockUpstream::new().with_file(&image_url("a"), png(40, 20, RED), "image/png");
    let app = TestApp::new(upstream, None).await;

    app.cache
        .add(cache_key("bob", "D9y"), vec![image_url("a")])
        .await
        .unwrap();

    let response = app.get("/mosaic/bob/post/D9y").await;
    assert_eq!(response.status(), StatusCode::OK);

    let decoded = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!(decoded.dimensions(), (400, 200));
}

#[tokio::test]
async fn test_mosaic_missing_source_is_bad_gateway() {
    let upstream = MockUpstream::new().with_file(&image_url("a"), png(50, 50, RED), "image/png");
    let app = TestApp::new(upstream, None).await;

    app.cache
        .add(
            cache_key("alice", "C8x"),
            vec![image_url("a"), image_url("gone")],
        )
        .await
        .unwrap();

    let response = app.get("/mosaic/alice/post/C8x").await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"], "upstream_error");
}

#[tokio::test]
async fn test_mosaic_undecodable_source_is_server_error() {
    let upstream =
        MockUpstream::new().with_file(&image_url("a"), b"not an image".to_vec(), "image/jpeg");
    let app = TestApp::new(upstream, None).await;

    app.cache
        .add(cache_key("alice", "C8x"), vec![image_url("a")])
        .await
        .unwrap();

    let response = app.get("/mosaic/alice/post/C8x").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_mosaic_too_tall_is_bad_request() {
    // At the app width of 400 this sliver needs a canvas 40 million pixels tall.
    let upstream =
        MockUpstream::new().with_file(&image_url("sliver"), png(1, 100_000, RED), "image/png");
    let app = TestApp::new(upstream, None).await;

    app.cache
        .add(cache_key("alice", "C8x"), vec![image_url("sliver")])
        .await
        .unwrap();

    let response = app.get("/mosaic/alice/post/C8x").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_mosaic");
}

#[tokio::test]
async fn test_mosaic_empty_entry_is_not_found() {
    let app = TestApp::new(MockUpstream::new(), None).await;

    app.cache
        .add(cache_key("alice", "C8x"), Vec::new())
        .await
        .unwrap();

    let response = app.get("/mosaic/alice/post/C8x").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
