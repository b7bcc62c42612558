//! Persistent media URL cache.
//!
//! Maps a post key (`"{username}|{post_id}"`) to the image URLs seen when the
//! preview page was rendered, so the mosaic endpoint can rebuild the collage
//! later without calling the extractor again.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐        ┌─────────────────────┐
//! │           TtlCache           │◄───────│   sweeper task      │
//! │  RwLock<HashMap<key, entry>> │ sweep  │ (interval + cancel) │
//! └──────────────┬───────────────┘        └─────────────────────┘
//!                │ save (full overwrite)
//!                ▼
//!         cache.json on disk
//! ```
//!
//! Reads never expire entries; only a sweep removes them.

mod store;
mod sweeper;

pub use store::{cache_key, now_millis, CacheEntry, TtlCache};
pub use sweeper::{spawn_sweeper, DEFAULT_CACHE_WINDOW, DEFAULT_SWEEP_INTERVAL};
