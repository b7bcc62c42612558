//! # fxtg
//!
//! Telegram-friendly previews for social media posts.
//!
//! Chat clients fetch `/{username}/post/{post_id}` and get an OpenGraph /
//! Twitter-card page. Videos are re-served through a tokenized, whitelisted
//! media proxy with HTTP range support, and multi-image posts get a single
//! mosaic image built on demand.
//!
//! ## Architecture
//!
//! - [`cache`] - TTL-bounded, file-backed post → image URL cache and its sweeper
//! - [`proxy`] - URL tokens, host whitelist, range handling and upstream streaming
//! - [`mosaic`] - Row layout search and rasterization
//! - [`post`] - Post records and the extractor boundary
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fxtg::{create_router, AppState, HttpUpstream, MediaProxy, RouterConfig, TtlCache, Whitelist};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = Arc::new(TtlCache::load("imageUrls.json").await?);
//!     let proxy = MediaProxy::new(Arc::new(HttpUpstream::new()?), Whitelist::default());
//!     let state = AppState::new(cache, proxy, "http://localhost:3000");
//!
//!     let router = create_router(state, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod mosaic;
pub mod post;
pub mod proxy;
pub mod server;

// Re-export commonly used types
pub use cache::{cache_key, spawn_sweeper, CacheEntry, TtlCache};
pub use config::Config;
pub use error::{CacheError, ExtractError, MosaicError, ProxyError, TokenError, UpstreamError};
pub use mosaic::{choose_layout, encode_png, Layout, LayoutOptions, Mosaic};
pub use post::{HttpExtractor, MediaItem, MediaKind, PostExtractor, PostRecord};
pub use proxy::{
    ByteRange, DecodedToken, HttpUpstream, MediaProxy, ProxiedMedia, Upstream, Whitelist,
};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
