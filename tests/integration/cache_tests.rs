//! Persistent cache integration tests.
//!
//! Tests verify:
//! - Entries written by the preview route survive a restart
//! - Reads never expire entries; only a sweep does
//! - Legacy and corrupt cache files are handled on load

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tempfile::TempDir;

use fxtg::cache::now_millis;
use fxtg::{cache_key, CacheError, TtlCache};

use super::test_utils::{png, MockExtractor, MockUpstream, TestApp, CDN};

const TWO_PHOTOS: &str = r#"{
    "description": "Two photos",
    "media": [
        {"url": "https://scontent.cdninstagram.com/v/a.jpg", "type": "photo"},
        {"url": "https://scontent.cdninstagram.com/v/b.jpg", "type": "photo"}
    ]
}"#;

const HOUR_MS: i64 = 60 * 60 * 1000;

fn photo_upstream() -> MockUpstream {
    MockUpstream::new()
        .with_file(&format!("{}/v/a.jpg", CDN), png(20, 20, [255, 0, 0, 255]), "image/png")
        .with_file(&format!("{}/v/b.jpg", CDN), png(20, 20, [0, 255, 0, 255]), "image/png")
}

async fn write_cache_file(dir: &TempDir, json: serde_json::Value) -> Arc<TtlCache> {
    let path = dir.path().join("cache.json");
    std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();
    Arc::new(TtlCache::load(&path).await.unwrap())
}

#[tokio::test]
async fn test_preview_entries_survive_restart() {
    let app = TestApp::new(photo_upstream(), Some(MockExtractor::returning(TWO_PHOTOS))).await;

    let request = Request::builder()
        .uri("/alice/post/C8x")
        .header(header::USER_AGENT, "TelegramBot (like TwitterBot)")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::OK);

    // The file on disk already holds the entry.
    let path = app.cache.path().to_path_buf();
    let on_disk: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let entry = &on_disk["alice|C8x"];
    assert_eq!(entry["value"].as_array().unwrap().len(), 2);
    assert!(entry["timestamp"].as_i64().unwrap() > 0);

    // A fresh process (new cache, new router, no extractor) can still build the mosaic.
    let reloaded = Arc::new(TtlCache::load(&path).await.unwrap());
    let restarted = TestApp::with_cache(photo_upstream(), None, reloaded, app.dir);

    let response = restarted.get("/mosaic/alice/post/C8x").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
}

#[tokio::test]
async fn test_stale_entry_is_served_until_swept() {
    let dir = TempDir::new().unwrap();
    let cache = write_cache_file(
        &dir,
        serde_json::json!({
            "alice|C8x": {
                "value": [format!("{}/v/a.jpg", CDN), format!("{}/v/b.jpg", CDN)],
                "timestamp": now_millis() - 3 * HOUR_MS
            }
        }),
    )
    .await;

    let app = TestApp::with_cache(photo_upstream(), None, Arc::clone(&cache), dir);

    // Reads never look at the timestamp.
    let response = app.get("/mosaic/alice/post/C8x").await;
    assert_eq!(response.status(), StatusCode::OK);

    let removed = cache.sweep(Duration::from_secs(60 * 60)).await.unwrap();
    assert_eq!(removed, 1);

    let response = app.get("/mosaic/alice/post/C8x").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The sweep was persisted.
    let reloaded = TtlCache::load(cache.path()).await.unwrap();
    assert!(reloaded.is_empty().await);
}

#[tokio::test]
async fn test_legacy_urls_field_is_accepted() {
    let dir = TempDir::new().unwrap();
    let cache = write_cache_file(
        &dir,
        serde_json::json!({
            "bob|D9y": {
                "urls": [format!("{}/v/a.jpg", CDN)],
                "timestamp": now_millis()
            }
        }),
    )
    .await;

    assert_eq!(
        cache.get(&cache_key("bob", "D9y")).await,
        Some(vec![format!("{}/v/a.jpg", CDN)])
    );

    let app = TestApp::with_cache(photo_upstream(), None, cache, dir);
    let response = app.get("/mosaic/bob/post/D9y").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_corrupt_cache_file_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let result = TtlCache::load(&path).await;
    assert!(matches!(result, Err(CacheError::Load { .. })));
}

#[tokio::test]
async fn test_missing_cache_file_starts_empty() {
    let dir = TempDir::new().unwrap();

    let cache = TtlCache::load(dir.path().join("absent.json")).await.unwrap();
    assert!(cache.is_empty().await);

    // Nothing is written until the first mutation.
    assert!(!dir.path().join("absent.json").exists());

    cache.add(cache_key("a", "b"), vec![]).await.unwrap();
    assert!(dir.path().join("absent.json").exists());
}
