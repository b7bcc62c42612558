//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          HTTP Layer                             │
//! │   /media_download   /mosaic/{u}/post/{id}   /{u}/post/{id}      │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │   preview   │  │        routes           │  │
//! │  │ (requests)  │  │ (card HTML) │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod preview;
pub mod routes;

pub use handlers::{
    health_handler, media_download_handler, mosaic_handler, preview_handler, AppState,
    ErrorResponse, HandlerError, HealthResponse, DEFAULT_ORIGIN_URL, PREVIEW_USER_AGENT,
};
pub use preview::{PreviewPage, PreviewVideo};
pub use routes::{create_router, RouterConfig};
